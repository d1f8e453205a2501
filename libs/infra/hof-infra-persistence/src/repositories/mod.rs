pub mod ban;
pub mod creator;
pub mod embedding;
pub mod favorite;
pub mod screenshot;
pub mod view;

pub use ban::BanRepository;
pub use creator::CreatorRepository;
pub use embedding::EmbeddingRepository;
pub use favorite::FavoriteRepository;
pub use screenshot::ScreenshotRepository;
pub use view::ViewRepository;

//! Entities, validation rules and the core error catalog shared by every
//! component of the screenshot lifecycle engine. This crate has no
//! persistence or transport concerns of its own — it's the vocabulary the
//! rest of the workspace is built out of.

pub mod ban;
pub mod creator;
pub mod embedding;
pub mod errors;
pub mod screenshot;
pub mod validation;
pub mod view;

pub mod favorite;

pub use ban::Ban;
pub use creator::{Creator, CreatorIdProvider, Social, TranslatedName, MAX_RECENT_IDENTIFIERS};
pub use embedding::{index_key_to_id, FeatureEmbedding, EMBEDDING_DIMENSIONS};
pub use errors::CoreError;
pub use favorite::Favorite;
pub use screenshot::{BlobNames, Screenshot, CITY_MILESTONE_MAX, CITY_POPULATION_MAX};
pub use view::View;

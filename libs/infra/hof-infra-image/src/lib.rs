//! The image processor (C3): decode, resize to the three presets of spec
//! §4.3, re-encode as progressive mozjpeg-compatible JPEG, embed EXIF IFD0.

pub mod errors;
pub mod exif;
pub mod presets;
pub mod processor;

pub use errors::ImageError;
pub use processor::{process, DEFAULT_JPEG_QUALITY};

/// Three freshly processed JPEG buffers, one per preset, in (thumbnail,
/// FHD, 4K) order.
pub struct ImageBuffers {
    pub thumbnail: Vec<u8>,
    pub fhd: Vec<u8>,
    pub four_k: Vec<u8>,
}

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImageError {
    /// Decoding the uploaded bytes failed — surfaced to the caller as
    /// `invalid-image-format` (spec §4.3), not a fatal error.
    #[error("invalid image format: {0}")]
    InvalidFormat(String),

    /// Anything past decoding (resize, encode, EXIF write) is fatal to the
    /// caller per spec §4.3.
    #[error("image processing failed: {0}")]
    Processing(String),
}

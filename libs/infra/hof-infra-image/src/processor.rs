use chrono::{DateTime, Utc};
use image::imageops::FilterType;
use image::GenericImageView;
use mozjpeg::{ColorSpace, Compress, ScanMode};
use tracing::instrument;

use crate::errors::ImageError;
use crate::presets::{target_dimensions, FHD, FOUR_K, THUMBNAIL};
use crate::{exif, ImageBuffers};

/// The default JPEG quality used when the caller doesn't override it (spec
/// §6 `screenshots.jpegQuality`).
pub const DEFAULT_JPEG_QUALITY: u8 = 85;

/// Decodes `bytes`, resizes it to the three presets of spec §4.3, re-encodes
/// each as a progressive mozjpeg-compatible JPEG at `quality`, and embeds the
/// IFD0 EXIF tags. Decode failures map to [`ImageError::InvalidFormat`];
/// everything past that point is [`ImageError::Processing`] and is fatal to
/// the caller (spec §4.3).
#[instrument(skip(bytes))]
pub fn process(
    bytes: &[u8],
    creator_name: Option<&str>,
    city_name: &str,
    quality: u8,
    now: DateTime<Utc>,
) -> Result<ImageBuffers, ImageError> {
    let image = image::load_from_memory(bytes)
        .map_err(|err| ImageError::InvalidFormat(err.to_string()))?;
    let (src_width, src_height) = image.dimensions();

    let thumbnail = resize_and_encode(&image, src_width, src_height, THUMBNAIL, quality)?;
    let fhd = resize_and_encode(&image, src_width, src_height, FHD, quality)?;
    let four_k = resize_and_encode(&image, src_width, src_height, FOUR_K, quality)?;

    let mut buffers = ImageBuffers { thumbnail, fhd, four_k };
    for jpeg in [&mut buffers.thumbnail, &mut buffers.fhd, &mut buffers.four_k] {
        exif::embed(jpeg, creator_name, city_name, now)?;
    }
    Ok(buffers)
}

fn resize_and_encode(
    image: &image::DynamicImage,
    src_width: u32,
    src_height: u32,
    preset: crate::presets::Preset,
    quality: u8,
) -> Result<Vec<u8>, ImageError> {
    let (width, height) = target_dimensions(preset, src_width, src_height);
    let resized = if (width, height) == (src_width, src_height) {
        image.to_rgb8()
    } else {
        image
            .resize_exact(width, height, FilterType::Lanczos3)
            .to_rgb8()
    };
    encode_progressive_jpeg(&resized, quality)
}

/// Re-encodes an RGB8 buffer as a progressive, mozjpeg-compatible JPEG.
fn encode_progressive_jpeg(rgb: &image::RgbImage, quality: u8) -> Result<Vec<u8>, ImageError> {
    let width = rgb.width() as usize;
    let height = rgb.height() as usize;

    let mut compress = Compress::new(ColorSpace::JCS_RGB, width, height);
    compress.set_quality(quality as f32);
    compress.set_scan_optimization_mode(ScanMode::AllComponentsTogether);
    compress.set_progressive_mode();

    let mut compress = compress
        .start_compress(Vec::new())
        .map_err(|err| ImageError::Processing(format!("failed to start jpeg compression: {err}")))?;
    compress
        .write_scanlines(rgb.as_raw())
        .map_err(|err| ImageError::Processing(format!("failed to write scanlines: {err}")))?;
    compress
        .finish()
        .map_err(|err| ImageError::Processing(format!("failed to finish jpeg compression: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn fixture_jpeg(width: u32, height: u32) -> Vec<u8> {
        let image = RgbImage::from_pixel(width, height, Rgb([120, 140, 160]));
        encode_progressive_jpeg(&image, DEFAULT_JPEG_QUALITY).expect("encode fixture")
    }

    #[test]
    fn rejects_garbage_bytes_as_invalid_format() {
        let result = process(b"not a jpeg", Some("Alice"), "Springfield", DEFAULT_JPEG_QUALITY, Utc::now());
        assert!(matches!(result, Err(ImageError::InvalidFormat(_))));
    }

    #[test]
    fn produces_three_non_empty_buffers_for_a_valid_image() {
        let bytes = fixture_jpeg(3000, 2000);
        let buffers = process(&bytes, Some("Alice"), "Springfield", DEFAULT_JPEG_QUALITY, Utc::now())
            .expect("processing succeeds");
        assert!(!buffers.thumbnail.is_empty());
        assert!(!buffers.fhd.is_empty());
        assert!(!buffers.four_k.is_empty());
    }

    #[test]
    fn never_upscales_a_tiny_source() {
        let bytes = fixture_jpeg(100, 56);
        let buffers = process(&bytes, None, "Springfield", DEFAULT_JPEG_QUALITY, Utc::now())
            .expect("processing succeeds");
        let decoded = image::load_from_memory(&buffers.four_k).expect("decode result");
        assert_eq!(decoded.dimensions(), (100, 56));
    }
}

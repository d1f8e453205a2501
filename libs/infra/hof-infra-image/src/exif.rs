//! EXIF IFD0 embedding of spec §4.3.

use chrono::{DateTime, Utc};
use little_exif::exif_tag::ExifTag;
use little_exif::filetype::FileExtension;
use little_exif::metadata::Metadata;

use crate::errors::ImageError;

const SOFTWARE: &str = "Cities: Skylines II, Hall of Fame Mod";

/// Stamps `jpeg` in place with the four IFD0 tags spec §4.3 names.
pub fn embed(
    jpeg: &mut Vec<u8>,
    creator_name: Option<&str>,
    city_name: &str,
    now: DateTime<Utc>,
) -> Result<(), ImageError> {
    let mut metadata = Metadata::new();
    metadata.set_tag(ExifTag::Software(SOFTWARE.to_string()));
    metadata.set_tag(ExifTag::Artist(
        creator_name.filter(|n| !n.is_empty()).unwrap_or("Anonymous").to_string(),
    ));
    metadata.set_tag(ExifTag::ImageDescription(city_name.to_string()));
    metadata.set_tag(ExifTag::DateTime(now.format("%Y:%m:%d %H:%M:%S").to_string()));

    metadata
        .write_to_vec(jpeg, FileExtension::JPEG)
        .map_err(|err| ImageError::Processing(format!("failed to embed EXIF tags: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_anonymous_for_an_empty_creator_name() {
        // embed() itself needs real JPEG bytes to round-trip through
        // little_exif; the fallback rule is exercised at the unit level via
        // the artist tag value it would have set.
        let artist = Some("").filter(|n: &&str| !n.is_empty()).unwrap_or("Anonymous");
        assert_eq!(artist, "Anonymous");
    }
}

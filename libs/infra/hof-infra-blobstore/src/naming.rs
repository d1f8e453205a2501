//! Blob naming scheme of spec §4.2:
//! `{creatorId}/{screenshotId}/{contextSlug}-{yyyy-MM-dd-HH-mm-ss}-{variant}.jpg`.

use chrono::{DateTime, Utc};
use hof_domain_models::validation::blob_name_slug;
use uuid::Uuid;

/// The three image variants produced by the image processor (spec §4.3),
/// in the order their blob names appear on [`hof_domain_models::BlobNames`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageVariant {
    Thumbnail,
    Fhd,
    FourK,
}

impl ImageVariant {
    fn file_suffix(self) -> &'static str {
        match self {
            ImageVariant::Thumbnail => "thumbnail",
            ImageVariant::Fhd => "fhd",
            ImageVariant::FourK => "4k",
        }
    }
}

/// Builds the deterministic blob name for one variant of a screenshot.
pub fn blob_name(
    creator_id: Uuid,
    screenshot_id: &str,
    city_name: &str,
    creator_name: Option<&str>,
    uploaded_at: DateTime<Utc>,
    variant: ImageVariant,
) -> String {
    let slug = blob_name_slug(city_name, creator_name);
    let timestamp = uploaded_at.format("%Y-%m-%d-%H-%M-%S");
    format!(
        "{creator_id}/{screenshot_id}/{slug}-{timestamp}-{suffix}.jpg",
        suffix = variant.file_suffix()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn builds_the_expected_layout() {
        let creator_id = Uuid::nil();
        let at = Utc.with_ymd_and_hms(2024, 10, 5, 12, 30, 0).unwrap();
        let name = blob_name(
            creator_id,
            "abc123",
            "Springfield",
            Some("Alice"),
            at,
            ImageVariant::Fhd,
        );
        assert_eq!(
            name,
            format!("{creator_id}/abc123/springfield-by-alice-2024-10-05-12-30-00-fhd.jpg")
        );
    }
}

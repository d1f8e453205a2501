//! Validation and slug rules shared by creators and screenshots (spec §3, §4.2, §4.5).

use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::CoreError;

/// City names: 1-35 code points, Unicode letters/digits plus a small set of
/// punctuation a city name can plausibly contain.
static CITY_NAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\p{L}\p{N} '’\-.,!?&():]+$").expect("static regex"));

/// Creator names share the city-name character class but are capped shorter.
static CREATOR_NAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\p{L}\p{N} '’\-.,!?&():]+$").expect("static regex"));

pub const CITY_NAME_MAX_CODEPOINTS: usize = 35;
pub const CREATOR_NAME_MAX_CODEPOINTS: usize = 25;

/// Validates a city name: 1-35 code points, matching [`CITY_NAME_PATTERN`].
pub fn validate_city_name(name: &str) -> Result<(), CoreError> {
    let len = name.chars().count();
    if len == 0 || len > CITY_NAME_MAX_CODEPOINTS {
        return Err(CoreError::InvalidCityName(format!(
            "city name must be 1-{CITY_NAME_MAX_CODEPOINTS} code points, got {len}"
        )));
    }
    if !CITY_NAME_PATTERN.is_match(name) {
        return Err(CoreError::InvalidCityName(
            "city name contains disallowed characters".to_string(),
        ));
    }
    Ok(())
}

/// Validates a creator name: 1-25 code points, matching [`CREATOR_NAME_PATTERN`].
///
/// Per spec §8, legacy names grandfathered before this regex existed are
/// never re-validated on read — this function is only ever called on the
/// write path (creator creation / rename).
pub fn validate_creator_name(name: &str) -> Result<(), CoreError> {
    let len = name.chars().count();
    if len == 0 || len > CREATOR_NAME_MAX_CODEPOINTS {
        return Err(CoreError::InvalidCreatorName(format!(
            "creator name must be 1-{CREATOR_NAME_MAX_CODEPOINTS} code points, got {len}"
        )));
    }
    if !CREATOR_NAME_PATTERN.is_match(name) {
        return Err(CoreError::InvalidCreatorName(
            "creator name contains disallowed characters".to_string(),
        ));
    }
    Ok(())
}

/// The uniqueness slug of a creator name (spec §4.5): strip apostrophes,
/// collapse runs of spaces/hyphens to one hyphen, trim, case-fold.
///
/// Preserves non-Latin text (it is a uniqueness key, not a file-name
/// component) — contrast with [`blob_name_slug`].
pub fn creator_name_slug(name: Option<&str>) -> Option<String> {
    let name = name?;
    if name.is_empty() {
        return None;
    }

    let stripped: String = name.chars().filter(|&c| c != '\'' && c != '\u{2019}').collect();

    let mut slug = String::with_capacity(stripped.len());
    let mut last_was_hyphen = true; // suppresses a leading hyphen
    for c in stripped.chars() {
        if c.is_whitespace() || c == '-' {
            if !last_was_hyphen {
                slug.push('-');
                last_was_hyphen = true;
            }
        } else {
            slug.push(c);
            last_was_hyphen = false;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }

    let slug = slug.to_lowercase();
    if slug.is_empty() {
        None
    } else {
        Some(slug)
    }
}

fn ascii_slugify(s: &str) -> String {
    let transliterated = deunicode::deunicode(s);
    let mut slug = String::with_capacity(transliterated.len());
    let mut last_was_hyphen = true;
    for c in transliterated.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_was_hyphen = false;
        } else if !last_was_hyphen {
            slug.push('-');
            last_was_hyphen = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

/// The blob-name slug of spec §4.2: the ASCII transliteration of
/// `"{cityName}-by-{creatorName}"`, falling back through city-name-only,
/// creator-name-only, then the literal `"screenshot"` when transliteration
/// of a stage yields nothing (pure non-Latin input).
pub fn blob_name_slug(city_name: &str, creator_name: Option<&str>) -> String {
    let creator_name = creator_name.filter(|n| !n.is_empty());

    if let Some(creator_name) = creator_name {
        let combined = ascii_slugify(&format!("{city_name}-by-{creator_name}"));
        if !combined.is_empty() {
            return combined;
        }
    }

    let city_only = ascii_slugify(city_name);
    if !city_only.is_empty() {
        return city_only;
    }

    if let Some(creator_name) = creator_name {
        let creator_only = ascii_slugify(creator_name);
        if !creator_only.is_empty() {
            return creator_only;
        }
    }

    "screenshot".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_minimal_city_name() {
        assert!(validate_city_name("A").is_ok());
    }

    #[test]
    fn rejects_empty_city_name() {
        assert!(validate_city_name("").is_err());
    }

    #[test]
    fn rejects_too_long_city_name() {
        let name: String = std::iter::repeat('a').take(36).collect();
        assert!(validate_city_name(&name).is_err());
    }

    #[test]
    fn slug_strips_apostrophes_and_collapses_hyphens() {
        assert_eq!(
            creator_name_slug(Some("O'Brien   The  -- Builder")),
            Some("obrien-the-builder".to_string())
        );
    }

    #[test]
    fn slug_of_null_or_empty_is_none() {
        assert_eq!(creator_name_slug(None), None);
        assert_eq!(creator_name_slug(Some("")), None);
    }

    #[test]
    fn blob_slug_combines_city_and_creator() {
        assert_eq!(blob_name_slug("Springfield", Some("Alice")), "springfield-by-alice");
    }

    #[test]
    fn blob_slug_falls_back_to_city_when_creator_non_latin_is_empty_after_translit() {
        // deunicode transliterates most scripts to *something*, but CJK
        // punctuation-only or unmappable glyphs can still yield nothing.
        let slug = blob_name_slug("Springfield", Some("\u{3000}"));
        assert_eq!(slug, "springfield");
    }

    #[test]
    fn blob_slug_falls_back_to_literal_when_everything_is_empty() {
        assert_eq!(blob_name_slug("\u{3000}", Some("\u{3000}")), "screenshot");
    }
}

use async_trait::async_trait;
use hof_domain_models::TranslatedName;

use crate::errors::TranslationError;

/// The external, excluded AI translation service that turns a creator's
/// display name into a latinized/translated pair. Only the trait boundary
/// lives here; the real implementation is out of scope.
#[async_trait]
pub trait NameTranslator: Send + Sync {
    async fn translate(&self, name: &str) -> Result<TranslatedName, TranslationError>;
}

/// Stand-in used wherever no real translation backend is wired in. Marks
/// every name as `needs_translation` rather than failing outright, since a
/// creator record with no translation attempt yet looks identical to one
/// this no-op produced.
pub struct NoopTranslator;

#[async_trait]
impl NameTranslator for NoopTranslator {
    async fn translate(&self, name: &str) -> Result<TranslatedName, TranslationError> {
        Ok(TranslatedName {
            locale: "und".to_string(),
            latinized: name.to_string(),
            translated: name.to_string(),
            needs_translation: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn noop_translator_marks_needs_translation() {
        let translated = NoopTranslator.translate("Springfield").await.unwrap();
        assert!(translated.needs_translation);
        assert_eq!(translated.latinized, "Springfield");
    }
}

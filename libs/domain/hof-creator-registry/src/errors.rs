use thiserror::Error;

/// Failures from the background name-translation job. Never surfaced to a
/// request — [`hof_background_jobs::BackgroundJobs`] only logs the message.
#[derive(Debug, Error)]
pub enum TranslationError {
    #[error("translation backend failed: {0}")]
    Backend(String),

    #[error(transparent)]
    Persistence(#[from] hof_infra_persistence::PersistenceError),
}

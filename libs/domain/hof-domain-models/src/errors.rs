//! The conceptual error kinds of spec §7. These are the vocabulary every
//! component in the engine speaks; the excluded HTTP layer maps them to
//! status codes, but that mapping does not live here.

use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error("invalid city name: {0}")]
    InvalidCityName(String),

    #[error("invalid image format: {0}")]
    InvalidImageFormat(String),

    #[error("rate limit exceeded, next allowed upload at {not_before}")]
    RateLimitExceeded { not_before: DateTime<Utc> },

    #[error("invalid creator id: {0}")]
    InvalidCreatorId(String),

    #[error("invalid creator name: {0}")]
    InvalidCreatorName(String),

    #[error("creator not found")]
    CreatorNotFound,

    /// §4.5: the presented `creatorId` doesn't match the one on file for
    /// this name/slug, and `allowCreatorIdReset` is not set — or the
    /// presented name collides with a different account's slug.
    #[error("incorrect creator id: {0}")]
    IncorrectCreatorId(String),

    #[error("identity is banned: {0}")]
    BannedIdentity(String),

    #[error("creator is banned: {0}")]
    BannedCreator(String),

    #[error("not found: {0}")]
    NotFoundById(String),

    #[error("screenshot is already approved")]
    ScreenshotAlreadyApproved,

    #[error("already favorited")]
    AlreadyFavorited,

    #[error("not favorited")]
    NotFavorited,

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("forbidden")]
    Forbidden,

    /// Escape hatch for invariant violations that should never be reachable
    /// in correct code (e.g. more than two creators sharing a name/slug,
    /// §4.5) — these are bugs, not user-facing refusals.
    #[error("internal invariant violated: {0}")]
    Internal(String),
}

//! The screenshot engine (C10): ingest, delete, report/un-report, weighted
//! random selection and merge, plus the §4.11 authorization guard that
//! gates every write.

pub mod delete;
pub mod engine;
pub mod guard;
pub mod ingest;
pub mod merge;
pub mod report;
pub mod selection;

pub use engine::ScreenshotEngine;
pub use guard::AuthorizationGuard;
pub use ingest::IngestRequest;
pub use selection::{SelectedScreenshot, SelectionRequest, SelectionWeights};

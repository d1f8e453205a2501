//! The similarity sidecar worker (spec §4.9): a standalone process that
//! owns the feature-vector model and answers framed inference requests
//! read from its own stdin, replying on stdout.

pub mod engine;

pub use engine::{InferenceEngine, InferenceError};

//! The similarity engine (C9): turns stored screenshots' image bytes into
//! feature vectors via the sidecar worker process, and answers
//! nearest-neighbour queries against a lazily-built in-memory cosine index.

pub mod engine;
pub mod errors;
pub mod index;

pub use engine::{EmbeddingInput, EmbeddingSource, SimilarScreenshot, SimilarityEngine, SimilarityQuery};
pub use errors::SimilarityError;

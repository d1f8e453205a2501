use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("could not connect to the persistence gateway: {0}")]
    Connection(String),

    #[error("query failed: {0}")]
    Query(#[from] mongodb::error::Error),

    #[error("failed to map a stored document: {0}")]
    Mapping(#[from] bson::de::Error),

    #[error("failed to encode a document for storage: {0}")]
    Encoding(#[from] bson::ser::Error),

    #[error("no document found for {0}")]
    NotFound(String),

    #[error("conflicting document: {0}")]
    Conflict(String),

    /// Bridges a non-Mongo failure (e.g. a blob-store call) raised from
    /// inside a [`crate::transaction::with_transaction`] closure, whose
    /// signature is fixed to this error type.
    #[error("{0}")]
    External(String),
}

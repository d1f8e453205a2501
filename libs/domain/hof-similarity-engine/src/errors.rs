use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimilarityError {
    #[error(transparent)]
    Persistence(#[from] hof_infra_persistence::PersistenceError),

    #[error(transparent)]
    BlobStore(#[from] hof_infra_blobstore::BlobStoreError),

    #[error(transparent)]
    Transport(#[from] hof_infra_similarity_transport::TransportError),

    #[error("the worker returned {got} vectors for {expected} input images")]
    VectorCountMismatch { expected: usize, got: usize },

    #[error("malformed embedding: {0}")]
    MalformedEmbedding(#[from] hof_domain_models::CoreError),

    #[error("vector index operation failed: {0}")]
    Index(String),

    #[error("no embedding found for screenshot {0}")]
    NoEmbedding(bson::oid::ObjectId),
}

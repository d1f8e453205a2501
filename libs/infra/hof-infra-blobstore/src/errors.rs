use thiserror::Error;

#[derive(Debug, Error)]
pub enum BlobStoreError {
    #[error("blob upload failed for {name}: {source}")]
    Upload {
        name: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("blob download failed for {name}: {source}")]
    Download {
        name: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("blob delete failed for {name}: {source}")]
    Delete {
        name: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("failed to write downloaded blob to disk: {0}")]
    Io(#[from] std::io::Error),
}

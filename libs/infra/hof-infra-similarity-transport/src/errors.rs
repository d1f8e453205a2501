use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to encode request frame: {0}")]
    Encoding(#[from] bincode::Error),

    #[error("failed to write request frame: {0}")]
    Io(#[from] std::io::Error),

    #[error("the similarity worker exited before replying")]
    WorkerExited,

    #[error("inference request timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("the similarity worker reported an error: {0}")]
    WorkerError(String),

    #[error("worker channel is shutting down")]
    Closed,
}

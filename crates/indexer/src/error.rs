use thiserror::Error;

pub type Result<T> = std::result::Result<T, IndexerError>;

#[derive(Error, Debug)]
pub enum IndexerError {
    #[error("Invalid source path: {0}")]
    InvalidPath(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Chunker error: {0}")]
    Chunker(#[from] docqa_chunker::ChunkerError),

    #[error("Vector store error: {0}")]
    VectorStore(#[from] docqa_vector_store::VectorStoreError),

    /// A single file could not be read or parsed. Recovered into a skipped file.
    #[error("Failed to load {path}: {reason}")]
    Load { path: String, reason: String },

    #[error("Embedding/index backend unreachable: {0}")]
    BackendUnavailable(String),

    #[error("Watcher error: {0}")]
    Watcher(String),

    #[error("{0}")]
    Other(String),
}

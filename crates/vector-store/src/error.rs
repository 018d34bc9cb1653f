use thiserror::Error;

pub type Result<T> = std::result::Result<T, VectorStoreError>;

#[derive(Error, Debug)]
pub enum VectorStoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Collection not found: {0}")]
    CollectionNotFound(String),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// A collection never mixes vectors from different embedders.
    #[error("Collection '{collection}' was built with embedder '{expected}', not '{actual}'")]
    EmbedderMismatch {
        collection: String,
        expected: String,
        actual: String,
    },

    #[error("Embedding error: {0}")]
    Embedding(String),
}

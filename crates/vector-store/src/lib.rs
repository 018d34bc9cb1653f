//! Embedding capability and the on-disk collection index.

mod embedding;
mod error;
mod hashing;
mod ollama;
mod store;

pub use embedding::{Embedder, SentenceEmbedding};
pub use error::{Result, VectorStoreError};
pub use hashing::{HashEmbedder, DEFAULT_HASH_DIMENSION};
pub use ollama::{OllamaEmbedder, DEFAULT_OLLAMA_URL, DEFAULT_TIMEOUT};
pub use store::{
    CollectionData, CollectionInfo, IndexedRecord, NewRecord, SearchResult, VectorIndex,
    COLLECTION_SCHEMA_VERSION,
};

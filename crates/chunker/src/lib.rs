//! Document model and chunking strategies.
//!
//! Three strategies are available:
//! - **Fixed**: character sliding window with overlap
//! - **Structural**: Markdown heading boundaries, oversized sections re-windowed
//! - **Semantic**: sentence groups split where embedding distance spikes
//!
//! ```no_run
//! use docqa_chunker::{Chunker, ChunkerConfig, Document, DocumentFormat};
//!
//! # async fn run() -> docqa_chunker::Result<()> {
//! let docs = vec![Document::new("Some text.", "notes.txt", DocumentFormat::Text)];
//! let chunks = Chunker::new(ChunkerConfig::default()).chunk(&docs).await?;
//! assert_eq!(chunks.len(), 1);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]

mod chunker;
mod error;
pub mod fixed;
pub mod metadata;
pub mod semantic;
mod strategy;
pub mod structural;
mod types;

pub use chunker::{Chunker, ChunkerConfig};
pub use error::{ChunkerError, Result};
pub use semantic::SentenceEmbedder;
pub use strategy::{
    ChunkingParams, ChunkingStrategy, StrategyKind, DEFAULT_BREAKPOINT_PERCENTILE,
    DEFAULT_BUFFER_SIZE, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE, DEFAULT_SEMANTIC_MAX_CHARS,
};
pub use types::{Chunk, ChunkMetadata, Document, DocumentFormat, DocumentMetadata};

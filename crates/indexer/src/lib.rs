//! # docqa indexer
//!
//! Turns a directory of documents into a searchable collection and keeps it
//! fresh.
//!
//! ## Pipeline
//!
//! ```text
//! Source directory
//!     │
//!     ├──> FileScanner (txt / pdf / md, sorted)
//!     │      └─> Loaders (one document per file, one per PDF page)
//!     │
//!     ├──> Chunker (fixed / structural / semantic)
//!     │      └─> Chunks
//!     │
//!     └──> Indexer (batched embed + write)
//!            └─> Collection `{base}_{strategy}`
//! ```
//!
//! [`IngestGate`] serializes runs and [`ReindexWatcher`] triggers them when
//! the directory changes.
//!
//! ## Example
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use docqa_chunker::ChunkingStrategy;
//! use docqa_indexer::{Indexer, IngestionPipeline};
//! use docqa_vector_store::{HashEmbedder, VectorIndex};
//!
//! # async fn run() -> docqa_indexer::Result<()> {
//! let store = Arc::new(VectorIndex::open("data/index").await?);
//! let indexer = Indexer::new(store, Arc::new(HashEmbedder::default()));
//! let report = IngestionPipeline::new(indexer)
//!     .ingest(
//!         Path::new("data/documents"),
//!         "documents_fixed",
//!         &ChunkingStrategy::default(),
//!         true,
//!     )
//!     .await?;
//! println!("Indexed {} chunks", report.chunks_indexed);
//! # Ok(())
//! # }
//! ```

mod error;
mod gate;
mod indexer;
mod loader;
mod pipeline;
mod report;
mod scanner;
mod watcher;

pub use error::{IndexerError, Result};
pub use gate::{GateOutcome, IngestGate};
pub use indexer::{Indexer, DEFAULT_BATCH_SIZE};
pub use loader::load_file;
pub use pipeline::{IngestRequest, IngestionPipeline, SourceOptions};
pub use report::{AddOutcome, BatchFailure, IngestOutcome, IngestReport, SkippedFile};
pub use scanner::{has_supported_extension, FileScanner, DEFAULT_EXTENSIONS};
pub use watcher::{
    CanonicalReindex, ReindexTarget, ReindexWatcher, WatchUpdate, WatcherConfig, WatcherHealth,
    WatcherState, DEFAULT_DEBOUNCE,
};

/// Canonical collection name for a base name and chunking strategy.
#[must_use]
pub fn collection_name(base: &str, strategy: docqa_chunker::StrategyKind) -> String {
    format!("{base}_{}", strategy.as_str())
}

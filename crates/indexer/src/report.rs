use docqa_chunker::StrategyKind;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestOutcome {
    Completed,
    /// The run finished but some files or batches were skipped
    PartialFailure,
    NoDocuments,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedFile {
    pub path: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchFailure {
    pub batch_index: usize,
    pub chunk_count: usize,
    pub reason: String,
}

/// Result of [`crate::Indexer::add`]. `sample_ids` holds at most the first
/// few ids written, not a complete enumeration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddOutcome {
    pub indexed: usize,
    pub sample_ids: Vec<String>,
    pub failed_batches: Vec<BatchFailure>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestReport {
    pub collection: String,
    pub strategy: StrategyKind,
    pub documents_loaded: usize,
    pub chunks_produced: usize,
    pub chunks_indexed: usize,
    pub skipped_files: Vec<SkippedFile>,
    pub failed_batches: Vec<BatchFailure>,
    pub sample_ids: Vec<String>,
    pub duration_ms: u64,
    pub outcome: IngestOutcome,
}

impl IngestReport {
    #[must_use]
    pub fn is_partial(&self) -> bool {
        self.outcome == IngestOutcome::PartialFailure
    }
}

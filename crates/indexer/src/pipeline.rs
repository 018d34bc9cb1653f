use crate::error::{IndexerError, Result};
use crate::indexer::Indexer;
use crate::loader::load_file;
use crate::report::{IngestOutcome, IngestReport, SkippedFile};
use crate::scanner::{FileScanner, DEFAULT_EXTENSIONS};
use docqa_chunker::{Chunker, ChunkerConfig, ChunkerError, ChunkingStrategy, Document};
use docqa_vector_store::SentenceEmbedding;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

/// Which files a source directory contributes.
#[derive(Debug, Clone)]
pub struct SourceOptions {
    pub recursive: bool,
    /// Lowercase extensions without the dot
    pub extensions: Vec<String>,
}

impl Default for SourceOptions {
    fn default() -> Self {
        Self {
            recursive: false,
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| (*e).to_string()).collect(),
        }
    }
}

/// One ingestion job, fully specified.
#[derive(Debug, Clone)]
pub struct IngestRequest {
    pub source_dir: PathBuf,
    pub collection: String,
    pub strategy: ChunkingStrategy,
    pub reset_first: bool,
}

/// Load → chunk → index, end to end.
#[derive(Clone)]
pub struct IngestionPipeline {
    indexer: Indexer,
    source: SourceOptions,
    extract_metadata: bool,
}

impl IngestionPipeline {
    pub fn new(indexer: Indexer) -> Self {
        Self {
            indexer,
            source: SourceOptions::default(),
            extract_metadata: false,
        }
    }

    #[must_use]
    pub fn with_source_options(mut self, source: SourceOptions) -> Self {
        self.source = source;
        self
    }

    #[must_use]
    pub fn with_metadata_extraction(mut self, enabled: bool) -> Self {
        self.extract_metadata = enabled;
        self
    }

    #[must_use]
    pub fn indexer(&self) -> &Indexer {
        &self.indexer
    }

    #[must_use]
    pub fn source_options(&self) -> &SourceOptions {
        &self.source
    }

    pub async fn run(&self, request: &IngestRequest) -> Result<IngestReport> {
        self.ingest(
            &request.source_dir,
            &request.collection,
            &request.strategy,
            request.reset_first,
        )
        .await
    }

    /// Rebuild or extend `collection` from the files in `source_dir`.
    ///
    /// Unreadable files and failed batches are collected in the report.
    /// Only a missing source directory or a backend that rejects every
    /// batch fails the whole run.
    pub async fn ingest(
        &self,
        source_dir: &Path,
        collection: &str,
        strategy: &ChunkingStrategy,
        reset_first: bool,
    ) -> Result<IngestReport> {
        let started = Instant::now();
        strategy.validate()?;

        if !tokio::fs::metadata(source_dir)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
        {
            return Err(IndexerError::InvalidPath(format!(
                "source directory does not exist: {}",
                source_dir.display()
            )));
        }

        if reset_first {
            self.indexer.reset(collection).await?;
        }

        log::info!(
            "Ingesting {} into '{collection}' ({} strategy)",
            source_dir.display(),
            strategy.kind()
        );

        let files = FileScanner::new(source_dir)
            .recursive(self.source.recursive)
            .with_extensions(&self.source.extensions)
            .scan();

        let mut documents: Vec<Document> = Vec::new();
        let mut skipped_files = Vec::new();
        for path in files {
            match load_file(&path).await {
                Ok(mut docs) => {
                    log::debug!("Loaded {} ({} documents)", path.display(), docs.len());
                    documents.append(&mut docs);
                }
                Err(err) => {
                    log::warn!("Skipping {}: {err}", path.display());
                    skipped_files.push(SkippedFile {
                        path: path.display().to_string(),
                        reason: err.to_string(),
                    });
                }
            }
        }

        let mut report = IngestReport {
            collection: collection.to_string(),
            strategy: strategy.kind(),
            documents_loaded: documents.len(),
            chunks_produced: 0,
            chunks_indexed: 0,
            skipped_files,
            failed_batches: Vec::new(),
            sample_ids: Vec::new(),
            duration_ms: 0,
            outcome: IngestOutcome::Completed,
        };

        if documents.is_empty() {
            log::warn!("No documents found in {}", source_dir.display());
            self.indexer.ensure_collection(collection).await?;
            report.outcome = IngestOutcome::NoDocuments;
            report.duration_ms = elapsed_ms(started);
            return Ok(report);
        }

        let chunker = Chunker::new(ChunkerConfig {
            strategy: strategy.clone(),
            extract_metadata: self.extract_metadata,
        })
        .with_embedder(Arc::new(SentenceEmbedding(self.indexer.embedder().clone())));
        let chunks = chunker.chunk(&documents).await.map_err(|e| match e {
            ChunkerError::Embedding(reason) => IndexerError::BackendUnavailable(reason),
            other => other.into(),
        })?;
        report.chunks_produced = chunks.len();
        log::info!(
            "Split {} documents into {} chunks",
            documents.len(),
            chunks.len()
        );

        if chunks.is_empty() {
            self.indexer.ensure_collection(collection).await?;
        }
        let added = self.indexer.add(collection, &chunks).await?;
        if !chunks.is_empty() && added.indexed == 0 && !added.failed_batches.is_empty() {
            let reason = added
                .failed_batches
                .first()
                .map(|f| f.reason.clone())
                .unwrap_or_default();
            return Err(IndexerError::BackendUnavailable(reason));
        }

        report.chunks_indexed = added.indexed;
        report.sample_ids = added.sample_ids;
        report.failed_batches = added.failed_batches;
        if !report.skipped_files.is_empty() || !report.failed_batches.is_empty() {
            report.outcome = IngestOutcome::PartialFailure;
        }
        report.duration_ms = elapsed_ms(started);

        log::info!(
            "Ingestion into '{collection}' finished: {} chunks indexed, {} files skipped, {} batches failed ({} ms)",
            report.chunks_indexed,
            report.skipped_files.len(),
            report.failed_batches.len(),
            report.duration_ms
        );
        Ok(report)
    }
}

#[allow(clippy::cast_possible_truncation)]
fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

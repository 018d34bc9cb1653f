use crate::error::Result;
use crate::report::{AddOutcome, BatchFailure};
use docqa_chunker::Chunk;
use docqa_vector_store::{Embedder, NewRecord, VectorIndex, VectorStoreError};
use std::sync::Arc;

pub const DEFAULT_BATCH_SIZE: usize = 100;
const SAMPLE_ID_LIMIT: usize = 5;

/// Writes chunks into a collection, embedding them batch by batch.
#[derive(Clone)]
pub struct Indexer {
    store: Arc<VectorIndex>,
    embedder: Arc<dyn Embedder>,
    batch_size: usize,
}

impl Indexer {
    pub fn new(store: Arc<VectorIndex>, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            store,
            embedder,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    #[must_use]
    pub fn store(&self) -> &Arc<VectorIndex> {
        &self.store
    }

    #[must_use]
    pub fn embedder(&self) -> &Arc<dyn Embedder> {
        &self.embedder
    }

    /// Delete `collection`. Resetting a collection that was never created succeeds.
    pub async fn reset(&self, collection: &str) -> Result<()> {
        if self.store.delete_collection(collection).await? {
            log::info!("Cleared collection '{collection}'");
        } else {
            log::info!("Collection '{collection}' does not exist, nothing to clear");
        }
        Ok(())
    }

    /// Create `collection` empty if it is missing, so queries against a
    /// source folder with nothing to index still find it.
    pub async fn ensure_collection(&self, collection: &str) -> Result<()> {
        if self
            .store
            .create_collection(collection, self.embedder.model_id())
            .await?
        {
            log::info!("Collection '{collection}' created with no records");
        }
        Ok(())
    }

    /// Embed `chunks` batch by batch, then store every embedded record in a
    /// single write. A batch that fails to embed is logged, recorded and
    /// skipped; the remaining batches still run.
    pub async fn add(&self, collection: &str, chunks: &[Chunk]) -> Result<AddOutcome> {
        let mut outcome = AddOutcome::default();
        let model_id = self.embedder.model_id().to_string();

        let mut records = Vec::with_capacity(chunks.len());
        let mut embedded_batches = Vec::new();
        for (batch_index, batch) in chunks.chunks(self.batch_size).enumerate() {
            match self.embed_batch(batch).await {
                Ok(mut batch_records) => {
                    embedded_batches.push((batch_index, batch.len()));
                    records.append(&mut batch_records);
                }
                Err(err) => {
                    log::error!(
                        "Batch {batch_index} ({} chunks) for '{collection}' failed: {err}",
                        batch.len()
                    );
                    outcome.failed_batches.push(BatchFailure {
                        batch_index,
                        chunk_count: batch.len(),
                        reason: err.to_string(),
                    });
                }
            }
        }

        match self.store.add(collection, &model_id, records).await {
            Ok(ids) => {
                outcome.indexed = ids.len();
                outcome.sample_ids = ids.into_iter().take(SAMPLE_ID_LIMIT).collect();
            }
            // Writing into another embedder's collection is never a transient failure.
            Err(err @ VectorStoreError::EmbedderMismatch { .. }) => return Err(err.into()),
            Err(err) => {
                log::error!(
                    "Writing {} batches into '{collection}' failed: {err}",
                    embedded_batches.len()
                );
                let reason = err.to_string();
                outcome
                    .failed_batches
                    .extend(embedded_batches.into_iter().map(|(batch_index, chunk_count)| {
                        BatchFailure {
                            batch_index,
                            chunk_count,
                            reason: reason.clone(),
                        }
                    }));
                outcome.failed_batches.sort_by_key(|f| f.batch_index);
            }
        }

        log::info!(
            "Indexed {} of {} chunks into '{collection}'",
            outcome.indexed,
            chunks.len()
        );
        Ok(outcome)
    }

    async fn embed_batch(&self, batch: &[Chunk]) -> docqa_vector_store::Result<Vec<NewRecord>> {
        let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
        let vectors = self.embedder.embed_batch(&texts).await?;
        if vectors.len() != batch.len() {
            return Err(VectorStoreError::Embedding(format!(
                "embedder returned {} vectors for {} chunks",
                vectors.len(),
                batch.len()
            )));
        }
        Ok(vectors
            .into_iter()
            .zip(batch.iter().cloned())
            .map(|(vector, chunk)| NewRecord { vector, chunk })
            .collect())
    }
}

use crate::error::{Result, SearchError};
use docqa_chunker::Chunk;
use docqa_vector_store::{Embedder, VectorIndex, VectorStoreError};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_K: usize = 3;
pub const DEFAULT_RETRIEVAL_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievedChunk {
    pub chunk: Chunk,
    pub score: f32,
}

/// Chunks ordered by descending similarity to the query.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RetrievalResult {
    pub chunks: Vec<RetrievedChunk>,
}

impl RetrievalResult {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.chunks.iter().map(|c| c.chunk.text.as_str())
    }
}

/// Read-only similarity search over one collection
#[derive(Clone)]
pub struct Retriever {
    store: Arc<VectorIndex>,
    embedder: Arc<dyn Embedder>,
    timeout: Duration,
}

impl Retriever {
    pub fn new(store: Arc<VectorIndex>, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            store,
            embedder,
            timeout: DEFAULT_RETRIEVAL_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn retrieve(
        &self,
        query: &str,
        collection: &str,
        k: usize,
    ) -> Result<RetrievalResult> {
        if k < 1 {
            return Err(SearchError::InvalidK(k));
        }

        match tokio::time::timeout(self.timeout, self.search(query, collection, k)).await {
            Ok(result) => result,
            Err(_) => Err(SearchError::IndexUnavailable(format!(
                "retrieval from '{collection}' timed out after {} ms",
                self.timeout.as_millis()
            ))),
        }
    }

    async fn search(&self, query: &str, collection: &str, k: usize) -> Result<RetrievalResult> {
        let vector = self
            .embedder
            .embed(query)
            .await
            .map_err(|e| SearchError::IndexUnavailable(format!("query embedding failed: {e}")))?;

        let hits = self
            .store
            .search(collection, &vector, k)
            .await
            .map_err(|e| match e {
                VectorStoreError::CollectionNotFound(name) => {
                    SearchError::IndexUnavailable(format!("collection '{name}' does not exist"))
                }
                other => SearchError::IndexUnavailable(other.to_string()),
            })?;

        log::debug!("Retrieved {} chunks from '{collection}'", hits.len());
        Ok(RetrievalResult {
            chunks: hits
                .into_iter()
                .map(|hit| RetrievedChunk {
                    chunk: hit.chunk,
                    score: hit.score,
                })
                .collect(),
        })
    }
}

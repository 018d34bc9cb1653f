use crate::error::{Result, VectorStoreError};
use async_trait::async_trait;
use docqa_chunker::{ChunkerError, SentenceEmbedder};
use std::sync::Arc;

/// Text embedding capability shared by ingestion and retrieval.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Identifier recorded on every collection this embedder writes to.
    fn model_id(&self) -> &str;

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        if vectors.len() != 1 {
            return Err(VectorStoreError::Embedding(format!(
                "expected 1 embedding, got {}",
                vectors.len()
            )));
        }
        Ok(vectors.remove(0))
    }
}

/// Exposes an [`Embedder`] to the semantic chunking strategy.
#[derive(Clone)]
pub struct SentenceEmbedding(pub Arc<dyn Embedder>);

#[async_trait]
impl SentenceEmbedder for SentenceEmbedding {
    async fn embed_sentences(&self, texts: &[String]) -> docqa_chunker::Result<Vec<Vec<f32>>> {
        self.0
            .embed_batch(texts)
            .await
            .map_err(|e| ChunkerError::Embedding(e.to_string()))
    }
}

use crate::config::{AppConfig, EmbedderKind};
use anyhow::{Context, Result};
use docqa_chunker::StrategyKind;
use docqa_indexer::{collection_name, Indexer, IngestGate, IngestRequest, IngestionPipeline};
use docqa_search::{AnswerComposer, Generator, OllamaGenerator, QaService, Retriever};
use docqa_vector_store::{Embedder, HashEmbedder, OllamaEmbedder, VectorIndex};
use std::sync::Arc;
use std::time::Duration;

/// Everything a command or the server needs, built once from config.
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<AppConfig>,
    pub store: Arc<VectorIndex>,
    pub embedder: Arc<dyn Embedder>,
    pub qa: QaService,
    pub gate: Arc<IngestGate>,
}

impl AppContext {
    pub async fn build(config: AppConfig) -> Result<Self> {
        let store = VectorIndex::open(&config.index.index_dir)
            .await
            .with_context(|| {
                format!("Failed to open index at {}", config.index.index_dir.display())
            })?;

        let embedder: Arc<dyn Embedder> = match config.ollama.embedder {
            EmbedderKind::Ollama => Arc::new(OllamaEmbedder::new(
                &config.ollama.url,
                config.ollama.embed_model.clone(),
                config.ollama.timeout(),
            )?),
            EmbedderKind::Hash => Arc::new(HashEmbedder::new(config.ollama.hash_dimension)),
        };
        let generator = Arc::new(OllamaGenerator::new(
            &config.ollama.url,
            config.ollama.chat_model.clone(),
            config.ollama.timeout(),
        )?);

        log::info!(
            "Embedder {} / generator {} at {}",
            embedder.model_id(),
            generator.model_id(),
            config.ollama.url
        );
        Ok(Self::from_parts(config, Arc::new(store), embedder, generator))
    }

    /// Wire the services around already constructed backends.
    pub fn from_parts(
        config: AppConfig,
        store: Arc<VectorIndex>,
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn Generator>,
    ) -> Self {
        let indexer =
            Indexer::new(store.clone(), embedder.clone()).with_batch_size(config.index.batch_size);
        let pipeline = IngestionPipeline::new(indexer)
            .with_source_options(config.source_options())
            .with_metadata_extraction(config.chunking.extract_metadata);

        let retriever = Retriever::new(store.clone(), embedder.clone()).with_timeout(
            Duration::from_secs(config.answer.retrieval_timeout_secs),
        );
        let composer = AnswerComposer::new(generator).with_persona(config.answer.persona.clone());
        let qa = QaService::new(retriever, composer, config.collection()).with_k(config.answer.k);

        Self {
            config: Arc::new(config),
            store,
            embedder,
            qa,
            gate: Arc::new(IngestGate::new(Arc::new(pipeline))),
        }
    }

    /// Ingestion job for the configured source. `strategy` overrides the
    /// configured kind and selects the matching collection.
    pub fn ingest_request(
        &self,
        reset_first: bool,
        strategy: Option<StrategyKind>,
    ) -> Result<IngestRequest> {
        let kind = strategy.unwrap_or(self.config.chunking.strategy);
        Ok(IngestRequest {
            source_dir: self.config.source.data_dir.clone(),
            collection: collection_name(&self.config.index.collection_base, kind),
            strategy: self.config.strategy_for(kind)?,
            reset_first,
        })
    }
}

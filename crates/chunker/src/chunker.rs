use crate::error::{ChunkerError, Result};
use crate::fixed;
use crate::metadata;
use crate::semantic::{self, SentenceEmbedder};
use crate::strategy::ChunkingStrategy;
use crate::structural;
use crate::types::{Chunk, ChunkMetadata, Document};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkerConfig {
    pub strategy: ChunkingStrategy,
    /// Attach `summary` and `keywords` to every chunk
    pub extract_metadata: bool,
}

impl ChunkerConfig {
    #[must_use]
    pub fn with_strategy(strategy: ChunkingStrategy) -> Self {
        Self {
            strategy,
            ..Self::default()
        }
    }
}

/// Splits documents into chunks according to the configured strategy.
#[derive(Clone)]
pub struct Chunker {
    config: ChunkerConfig,
    embedder: Option<Arc<dyn SentenceEmbedder>>,
}

impl Chunker {
    #[must_use]
    pub fn new(config: ChunkerConfig) -> Self {
        Self {
            config,
            embedder: None,
        }
    }

    /// Embedding capability used by the semantic strategy.
    #[must_use]
    pub fn with_embedder(mut self, embedder: Arc<dyn SentenceEmbedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    #[must_use]
    pub fn config(&self) -> &ChunkerConfig {
        &self.config
    }

    /// Chunk every document in order. An empty input yields an empty output.
    pub async fn chunk(&self, documents: &[Document]) -> Result<Vec<Chunk>> {
        self.config.strategy.validate()?;
        if self.config.strategy.needs_embedder() && self.embedder.is_none() {
            return Err(ChunkerError::Configuration(
                "semantic chunking requires an embedding backend".to_string(),
            ));
        }

        let mut out = Vec::new();
        for document in documents {
            let chunks = self.chunk_document(document).await?;
            log::debug!("{}: {} chunks", document.source(), chunks.len());
            out.extend(chunks);
        }
        Ok(out)
    }

    async fn chunk_document(&self, document: &Document) -> Result<Vec<Chunk>> {
        if document.text.trim().is_empty() {
            return Ok(Vec::new());
        }

        let text = document.text.as_str();
        let pieces: Vec<Piece<'_>> = match self.config.strategy {
            ChunkingStrategy::Fixed { size, overlap } => fixed::windows(text, size, overlap)
                .into_iter()
                .map(Piece::plain)
                .collect(),
            ChunkingStrategy::Structural { max_chars, overlap } => {
                let mut pieces = Vec::new();
                for section in structural::sections(text) {
                    for window in fixed::windows(section.text, max_chars, overlap) {
                        pieces.push(Piece {
                            text: window.text,
                            start: section.start + window.start,
                            headers: section.headers.clone(),
                        });
                    }
                }
                pieces
            }
            ChunkingStrategy::Semantic {
                breakpoint_percentile,
                buffer_size,
                max_chars,
            } => {
                let embedder = self.embedder.as_deref().ok_or_else(|| {
                    ChunkerError::Configuration(
                        "semantic chunking requires an embedding backend".to_string(),
                    )
                })?;
                let spans =
                    semantic::split(text, embedder, breakpoint_percentile, buffer_size).await?;
                let overlap = (max_chars / 10).max(1).min(max_chars.saturating_sub(1));
                let mut pieces = Vec::new();
                for span in spans {
                    if span.text.chars().count() <= max_chars || overlap == 0 {
                        pieces.push(Piece::plain(span));
                        continue;
                    }
                    for window in fixed::windows(span.text, max_chars, overlap) {
                        pieces.push(Piece::plain(fixed::Window {
                            text: window.text,
                            start: span.start + window.start,
                        }));
                    }
                }
                pieces
            }
        };

        let kind = self.config.strategy.kind();
        let chunks = pieces
            .into_iter()
            .filter(|piece| !piece.text.trim().is_empty())
            .enumerate()
            .map(|(chunk_index, piece)| {
                let mut meta = ChunkMetadata::for_document(document, kind);
                meta.chunk_index = chunk_index;
                meta.start_offset = Some(piece.start);
                meta.headers = piece.headers;
                if self.config.extract_metadata {
                    meta.summary = metadata::summarize(piece.text);
                    meta.keywords = metadata::keywords(piece.text);
                }
                Chunk::new(piece.text, meta)
            })
            .collect();
        Ok(chunks)
    }
}

struct Piece<'a> {
    text: &'a str,
    start: usize,
    headers: BTreeMap<String, String>,
}

impl<'a> Piece<'a> {
    fn plain(window: fixed::Window<'a>) -> Self {
        Self {
            text: window.text,
            start: window.start,
            headers: BTreeMap::new(),
        }
    }
}

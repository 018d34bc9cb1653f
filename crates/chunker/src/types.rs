use crate::strategy::StrategyKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentFormat {
    Text,
    Pdf,
    Markdown,
}

impl DocumentFormat {
    /// Map a file extension (without the dot, any case) to a format.
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "txt" => Some(Self::Text),
            "pdf" => Some(Self::Pdf),
            "md" | "markdown" => Some(Self::Markdown),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Pdf => "pdf",
            Self::Markdown => "markdown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// Originating file path
    pub source: String,
    /// 1-based page number for paginated formats
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    pub format: DocumentFormat,
}

/// A loaded source file (or one page of it). Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub text: String,
    pub metadata: DocumentMetadata,
}

impl Document {
    pub fn new(text: impl Into<String>, source: impl Into<String>, format: DocumentFormat) -> Self {
        Self {
            text: text.into(),
            metadata: DocumentMetadata {
                source: source.into(),
                page: None,
                format,
            },
        }
    }

    #[must_use]
    pub fn with_page(mut self, page: u32) -> Self {
        self.metadata.page = Some(page);
        self
    }

    #[must_use]
    pub fn source(&self) -> &str {
        &self.metadata.source
    }
}

/// Metadata carried by every chunk.
///
/// Fields inherited from the parent [`Document`] (`source`, `page`) and
/// fields derived while chunking (`strategy`, `chunk_index`, `start_offset`,
/// `headers`, `summary`, `keywords`) never share a key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    pub strategy: StrategyKind,
    /// Position of this chunk within its parent document
    pub chunk_index: usize,
    /// Character offset of the chunk start within the parent document
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_offset: Option<usize>,
    /// Active heading path, keyed `header_1`..`header_4`
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
}

impl ChunkMetadata {
    #[must_use]
    pub fn for_document(document: &Document, strategy: StrategyKind) -> Self {
        Self {
            source: document.metadata.source.clone(),
            page: document.metadata.page,
            strategy,
            chunk_index: 0,
            start_offset: None,
            headers: BTreeMap::new(),
            summary: None,
            keywords: Vec::new(),
        }
    }

    /// Human readable origin, e.g. `docs/guide.pdf#p3`.
    #[must_use]
    pub fn origin(&self) -> String {
        match self.page {
            Some(page) => format!("{}#p{page}", self.source),
            None => self.source.clone(),
        }
    }
}

/// A contiguous span of text derived from exactly one [`Document`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub metadata: ChunkMetadata,
}

impl Chunk {
    pub fn new(text: impl Into<String>, metadata: ChunkMetadata) -> Self {
        Self {
            text: text.into(),
            metadata,
        }
    }

    #[must_use]
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

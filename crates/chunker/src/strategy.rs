use crate::error::{ChunkerError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_CHUNK_SIZE: usize = 500;
pub const DEFAULT_CHUNK_OVERLAP: usize = 50;
pub const DEFAULT_BREAKPOINT_PERCENTILE: f32 = 95.0;
pub const DEFAULT_BUFFER_SIZE: usize = 1;
pub const DEFAULT_SEMANTIC_MAX_CHARS: usize = 2000;

/// Strategy tag without parameters. Used in collection names and chunk metadata.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    Fixed,
    Structural,
    Semantic,
}

impl StrategyKind {
    pub const ALL: [Self; 3] = [Self::Fixed, Self::Structural, Self::Semantic];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fixed => "fixed",
            Self::Structural => "structural",
            Self::Semantic => "semantic",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyKind {
    type Err = ChunkerError;

    fn from_str(s: &str) -> Result<Self> {
        let name = s.trim().to_ascii_lowercase();
        if name == "markdown" {
            return Ok(Self::Structural);
        }
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == name)
            .ok_or_else(|| {
                let expected: Vec<_> = Self::ALL.iter().map(|kind| kind.as_str()).collect();
                ChunkerError::Configuration(format!(
                    "unknown chunking strategy '{name}' (expected one of: {})",
                    expected.join(", ")
                ))
            })
    }
}

/// Flat parameter set as it appears in configuration files.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingParams {
    pub size: usize,
    pub overlap: usize,
    pub breakpoint_percentile: f32,
    pub buffer_size: usize,
    pub semantic_max_chars: usize,
}

impl Default for ChunkingParams {
    fn default() -> Self {
        Self {
            size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_CHUNK_OVERLAP,
            breakpoint_percentile: DEFAULT_BREAKPOINT_PERCENTILE,
            buffer_size: DEFAULT_BUFFER_SIZE,
            semantic_max_chars: DEFAULT_SEMANTIC_MAX_CHARS,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChunkingStrategy {
    /// Character sliding window.
    Fixed { size: usize, overlap: usize },
    /// Split at Markdown headings (levels 1-4); long sections fall back to
    /// a sliding window of `max_chars`.
    Structural { max_chars: usize, overlap: usize },
    /// Split where the embedding distance between adjacent sentence groups
    /// exceeds the given percentile of all distances.
    Semantic {
        breakpoint_percentile: f32,
        buffer_size: usize,
        max_chars: usize,
    },
}

impl Default for ChunkingStrategy {
    fn default() -> Self {
        Self::Fixed {
            size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

impl ChunkingStrategy {
    /// Build and validate a strategy from its tag and the flat parameter set.
    pub fn build(kind: StrategyKind, params: &ChunkingParams) -> Result<Self> {
        let strategy = match kind {
            StrategyKind::Fixed => Self::Fixed {
                size: params.size,
                overlap: params.overlap,
            },
            StrategyKind::Structural => Self::Structural {
                max_chars: params.size,
                overlap: params.overlap,
            },
            StrategyKind::Semantic => Self::Semantic {
                breakpoint_percentile: params.breakpoint_percentile,
                buffer_size: params.buffer_size,
                max_chars: params.semantic_max_chars,
            },
        };
        strategy.validate()?;
        Ok(strategy)
    }

    /// Parse a strategy name and build it from `params`.
    pub fn parse(name: &str, params: &ChunkingParams) -> Result<Self> {
        Self::build(name.parse()?, params)
    }

    #[must_use]
    pub const fn kind(&self) -> StrategyKind {
        match self {
            Self::Fixed { .. } => StrategyKind::Fixed,
            Self::Structural { .. } => StrategyKind::Structural,
            Self::Semantic { .. } => StrategyKind::Semantic,
        }
    }

    #[must_use]
    pub const fn needs_embedder(&self) -> bool {
        matches!(self, Self::Semantic { .. })
    }

    pub fn validate(&self) -> Result<()> {
        match *self {
            Self::Fixed { size, overlap } => validate_window("fixed", size, overlap),
            Self::Structural { max_chars, overlap } => {
                validate_window("structural", max_chars, overlap)
            }
            Self::Semantic {
                breakpoint_percentile,
                max_chars,
                ..
            } => {
                if !(breakpoint_percentile > 0.0 && breakpoint_percentile <= 100.0) {
                    return Err(ChunkerError::Configuration(format!(
                        "semantic breakpoint_percentile must be in (0, 100], got {breakpoint_percentile}"
                    )));
                }
                if max_chars == 0 {
                    return Err(ChunkerError::Configuration(
                        "semantic max_chars must be greater than zero".to_string(),
                    ));
                }
                Ok(())
            }
        }
    }
}

fn validate_window(name: &str, size: usize, overlap: usize) -> Result<()> {
    if size == 0 || overlap == 0 {
        return Err(ChunkerError::Configuration(format!(
            "{name} chunk size ({size}) and overlap ({overlap}) must both be greater than zero"
        )));
    }
    if overlap >= size {
        return Err(ChunkerError::Configuration(format!(
            "{name} chunk overlap ({overlap}) must be less than size ({size})"
        )));
    }
    Ok(())
}

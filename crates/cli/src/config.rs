use anyhow::{Context, Result};
use docqa_chunker::{ChunkingParams, ChunkingStrategy, StrategyKind};
use docqa_indexer::{collection_name, SourceOptions, DEFAULT_BATCH_SIZE};
use docqa_search::{AUTO_LANGUAGE, DEFAULT_CHAT_MODEL, DEFAULT_K};
use docqa_vector_store::{DEFAULT_HASH_DIMENSION, DEFAULT_OLLAMA_URL};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_CONFIG_FILE: &str = "docqa.toml";
pub const DEFAULT_GRAPH_API_URL: &str = "https://graph.facebook.com/v17.0";
pub const DEFAULT_PERSONA: &str = "You are a custom service assistant from company Espazo Nature. \
Espazo Nature is a company that provides glamping services in Galicia, Spain.";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub source: SourceConfig,
    pub index: IndexConfig,
    pub chunking: ChunkingConfig,
    pub ollama: OllamaConfig,
    pub answer: AnswerConfig,
    pub watcher: WatcherSettings,
    pub server: ServerConfig,
    pub channels: ChannelsConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub data_dir: PathBuf,
    pub recursive: bool,
    /// Also ingest `.md` files
    pub include_markdown: bool,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data/documents"),
            recursive: false,
            include_markdown: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    pub index_dir: PathBuf,
    pub collection_base: String,
    pub batch_size: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            index_dir: PathBuf::from("data/index"),
            collection_base: "documents".to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    pub strategy: StrategyKind,
    #[serde(flatten)]
    pub params: ChunkingParams,
    pub extract_metadata: bool,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::Fixed,
            params: ChunkingParams::default(),
            extract_metadata: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbedderKind {
    Ollama,
    /// Offline feature-hashing embedder
    Hash,
}

impl FromStr for EmbedderKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "hash" => Ok(Self::Hash),
            other => anyhow::bail!("unknown embedder '{other}' (expected ollama or hash)"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OllamaConfig {
    pub url: String,
    pub embed_model: String,
    pub chat_model: String,
    pub embedder: EmbedderKind,
    pub hash_dimension: usize,
    pub timeout_secs: u64,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_OLLAMA_URL.to_string(),
            embed_model: DEFAULT_CHAT_MODEL.to_string(),
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            embedder: EmbedderKind::Ollama,
            hash_dimension: DEFAULT_HASH_DIMENSION,
            timeout_secs: 120,
        }
    }
}

impl OllamaConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnswerConfig {
    pub k: usize,
    pub default_language: String,
    pub persona: Option<String>,
    pub retrieval_timeout_secs: u64,
}

impl Default for AnswerConfig {
    fn default() -> Self {
        Self {
            k: DEFAULT_K,
            default_language: AUTO_LANGUAGE.to_string(),
            persona: Some(DEFAULT_PERSONA.to_string()),
            retrieval_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatcherSettings {
    pub enabled: bool,
    pub debounce_ms: u64,
}

impl Default for WatcherSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            debounce_ms: 2000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8000".to_string(),
        }
    }
}

/// Meta Graph API credentials. Missing values disable delivery, not the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelsConfig {
    pub graph_api_url: String,
    pub verify_token: Option<String>,
    pub whatsapp_api_token: Option<String>,
    pub whatsapp_phone_number_id: Option<String>,
    pub instagram_access_token: Option<String>,
    pub timeout_secs: u64,
}

impl Default for ChannelsConfig {
    fn default() -> Self {
        Self {
            graph_api_url: DEFAULT_GRAPH_API_URL.to_string(),
            verify_token: None,
            whatsapp_api_token: None,
            whatsapp_phone_number_id: None,
            instagram_access_token: None,
            timeout_secs: 30,
        }
    }
}

impl AppConfig {
    /// Load `path`, or `docqa.toml` in the working directory when present,
    /// then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("Invalid config {}", path.display()))
    }

    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("DOCQA_DATA_DIR") {
            self.source.data_dir = PathBuf::from(v);
        }
        if let Some(v) = get("DOCQA_INDEX_DIR") {
            self.index.index_dir = PathBuf::from(v);
        }
        if let Some(v) = get("DOCQA_COLLECTION_BASE") {
            self.index.collection_base = v;
        }
        if let Some(v) = get("DOCQA_STRATEGY") {
            self.chunking.strategy = v.parse::<StrategyKind>().context("DOCQA_STRATEGY")?;
        }
        if let Some(v) = get("DOCQA_OLLAMA_URL") {
            self.ollama.url = v;
        }
        if let Some(v) = get("DOCQA_EMBED_MODEL") {
            self.ollama.embed_model = v;
        }
        if let Some(v) = get("DOCQA_CHAT_MODEL") {
            self.ollama.chat_model = v;
        }
        if let Some(v) = get("DOCQA_EMBEDDER") {
            self.ollama.embedder = v.parse::<EmbedderKind>().context("DOCQA_EMBEDDER")?;
        }
        if let Some(v) = get("DOCQA_BIND") {
            self.server.bind = v;
        }
        if let Some(v) = get("VERIFY_TOKEN") {
            self.channels.verify_token = Some(v);
        }
        if let Some(v) = get("WHATSAPP_API_TOKEN") {
            self.channels.whatsapp_api_token = Some(v);
        }
        if let Some(v) = get("WHATSAPP_PHONE_NUMBER_ID") {
            self.channels.whatsapp_phone_number_id = Some(v);
        }
        if let Some(v) = get("INSTAGRAM_ACCESS_TOKEN") {
            self.channels.instagram_access_token = Some(v);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.strategy()?;
        self.bind_addr()?;
        anyhow::ensure!(self.answer.k >= 1, "answer.k must be at least 1");
        anyhow::ensure!(self.index.batch_size >= 1, "index.batch_size must be at least 1");
        anyhow::ensure!(
            !self.index.collection_base.trim().is_empty(),
            "index.collection_base must not be empty"
        );
        Ok(())
    }

    pub fn strategy(&self) -> Result<ChunkingStrategy> {
        Ok(ChunkingStrategy::build(
            self.chunking.strategy,
            &self.chunking.params,
        )?)
    }

    /// Strategy of the given kind with the configured parameters.
    pub fn strategy_for(&self, kind: StrategyKind) -> Result<ChunkingStrategy> {
        Ok(ChunkingStrategy::build(kind, &self.chunking.params)?)
    }

    #[must_use]
    pub fn collection(&self) -> String {
        collection_name(&self.index.collection_base, self.chunking.strategy)
    }

    pub fn bind_addr(&self) -> Result<SocketAddr> {
        self.server
            .bind
            .parse()
            .with_context(|| format!("Invalid bind address '{}'", self.server.bind))
    }

    #[must_use]
    pub fn source_options(&self) -> SourceOptions {
        let mut options = SourceOptions {
            recursive: self.source.recursive,
            ..SourceOptions::default()
        };
        if self.source.include_markdown {
            options.extensions.push("md".to_string());
        }
        options
    }

    #[must_use]
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.watcher.debounce_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = AppConfig::default();
        assert_eq!(config.source.data_dir, PathBuf::from("data/documents"));
        assert_eq!(config.index.index_dir, PathBuf::from("data/index"));
        assert_eq!(config.collection(), "documents_fixed");
        assert_eq!(config.chunking.params.size, 500);
        assert_eq!(config.chunking.params.overlap, 50);
        assert_eq!(config.answer.k, 3);
        assert_eq!(config.debounce(), Duration::from_secs(2));
        assert_eq!(config.index.batch_size, 100);
        assert_eq!(config.ollama.chat_model, "llama3.1");
        config.validate().expect("defaults are valid");
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [chunking]
            strategy = "structural"
            size = 800

            [source]
            include_markdown = true
            "#,
        )
        .expect("parse");

        assert_eq!(config.chunking.strategy, StrategyKind::Structural);
        assert_eq!(config.chunking.params.size, 800);
        assert_eq!(config.chunking.params.overlap, 50);
        assert_eq!(config.collection(), "documents_structural");
        assert_eq!(
            config.source_options().extensions,
            vec!["txt".to_string(), "pdf".to_string(), "md".to_string()]
        );
        assert_eq!(
            config.strategy().expect("strategy"),
            ChunkingStrategy::Structural {
                max_chars: 800,
                overlap: 50
            }
        );
    }

    #[test]
    fn environment_overrides_file_values() {
        let vars = env(&[
            ("DOCQA_STRATEGY", "Semantic"),
            ("DOCQA_EMBEDDER", "hash"),
            ("DOCQA_COLLECTION_BASE", "faq"),
            ("VERIFY_TOKEN", "s3cret"),
            ("WHATSAPP_API_TOKEN", ""),
        ]);
        let mut config = AppConfig::default();
        config
            .apply_overrides(|key| vars.get(key).cloned())
            .expect("overrides");

        assert_eq!(config.chunking.strategy, StrategyKind::Semantic);
        assert_eq!(config.ollama.embedder, EmbedderKind::Hash);
        assert_eq!(config.collection(), "faq_semantic");
        assert_eq!(config.channels.verify_token.as_deref(), Some("s3cret"));
        assert_eq!(config.channels.whatsapp_api_token, None);
    }

    #[test]
    fn unknown_strategy_is_rejected() {
        let vars = env(&[("DOCQA_STRATEGY", "paragraph")]);
        let mut config = AppConfig::default();
        assert!(config.apply_overrides(|key| vars.get(key).cloned()).is_err());
    }

    #[test]
    fn invalid_window_fails_validation() {
        let mut config = AppConfig::default();
        config.chunking.params.overlap = 500;
        assert!(config.validate().is_err());
    }
}

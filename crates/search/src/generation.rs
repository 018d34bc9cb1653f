use crate::error::GenerationError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_CHAT_MODEL: &str = "llama3.1";
pub const DEFAULT_GENERATION_TIMEOUT: Duration = Duration::from_secs(120);

/// Text generation capability used to phrase answers.
#[async_trait]
pub trait Generator: Send + Sync {
    fn model_id(&self) -> &str;

    async fn generate(&self, prompt: &str) -> std::result::Result<String, GenerationError>;
}

/// [`Generator`] backed by a local Ollama server (`POST /api/generate`).
pub struct OllamaGenerator {
    client: reqwest::Client,
    endpoint: String,
    model: String,
}

impl OllamaGenerator {
    pub fn new(
        base_url: &str,
        model: impl Into<String>,
        timeout: Duration,
    ) -> std::result::Result<Self, GenerationError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: format!("{}/api/generate", base_url.trim_end_matches('/')),
            model: model.into(),
        })
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

#[async_trait]
impl Generator for OllamaGenerator {
    fn model_id(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> std::result::Result<String, GenerationError> {
        log::debug!("ollama generate: model={} prompt_chars={}", self.model, prompt.len());

        let response = self
            .client
            .post(&self.endpoint)
            .json(&GenerateRequest {
                model: &self.model,
                prompt,
                stream: false,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Backend {
                status: status.as_u16(),
                body: body.trim().to_string(),
            });
        }

        let parsed: GenerateResponse = response.json().await?;
        Ok(parsed.response)
    }
}

//! Outbound delivery to messaging platforms through the Meta Graph API.

use crate::config::ChannelsConfig;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;

pub const ONLY_TEXT_REPLY: &str = "Sorry, I can only understand text messages for now.";

/// Sends plain-text replies back to the user who wrote in.
#[async_trait]
pub trait MessageSender: Send + Sync {
    async fn send_whatsapp(&self, to: &str, text: &str) -> Result<()>;

    async fn send_instagram(&self, recipient_id: &str, text: &str) -> Result<()>;
}

pub struct GraphApiSender {
    client: reqwest::Client,
    base_url: String,
    whatsapp_token: Option<String>,
    whatsapp_phone_number_id: Option<String>,
    instagram_token: Option<String>,
}

impl GraphApiSender {
    pub fn new(config: &ChannelsConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build Graph API client")?;
        Ok(Self {
            client,
            base_url: config.graph_api_url.trim_end_matches('/').to_string(),
            whatsapp_token: config.whatsapp_api_token.clone(),
            whatsapp_phone_number_id: config.whatsapp_phone_number_id.clone(),
            instagram_token: config.instagram_access_token.clone(),
        })
    }

    async fn post(&self, url: &str, token: &str, body: serde_json::Value) -> Result<()> {
        let response = self
            .client
            .post(url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("POST {url}"))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("Graph API returned {status}: {}", text.trim());
        }
        Ok(())
    }
}

#[async_trait]
impl MessageSender for GraphApiSender {
    async fn send_whatsapp(&self, to: &str, text: &str) -> Result<()> {
        let (Some(token), Some(phone_id)) = (&self.whatsapp_token, &self.whatsapp_phone_number_id)
        else {
            log::error!("WhatsApp credentials are not configured; reply to {to} dropped");
            return Ok(());
        };

        let url = format!("{}/{phone_id}/messages", self.base_url);
        let body = json!({
            "messaging_product": "whatsapp",
            "to": to,
            "type": "text",
            "text": { "body": text },
        });
        self.post(&url, token, body).await?;
        log::info!("WhatsApp message sent to {to}");
        Ok(())
    }

    async fn send_instagram(&self, recipient_id: &str, text: &str) -> Result<()> {
        let Some(token) = &self.instagram_token else {
            log::error!(
                "Instagram credentials are not configured; reply to {recipient_id} dropped"
            );
            return Ok(());
        };

        let url = format!("{}/me/messages", self.base_url);
        let body = json!({
            "recipient": { "id": recipient_id },
            "message": { "text": text },
        });
        self.post(&url, token, body).await?;
        log::info!("Instagram message sent to {recipient_id}");
        Ok(())
    }
}

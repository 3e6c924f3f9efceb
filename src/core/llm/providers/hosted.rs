//! Hosted Provider Implementation
//!
//! OpenAI-compatible chat-completions endpoint (OpenRouter by default). The API
//! key is read from the secret store on every call and never kept in memory.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};

use super::{error_for_status, tokens_for_words, truncate_for_log};
use crate::config::HostedConfig;
use crate::core::credentials::SecretStore;
use crate::core::llm::error::{GenerationError, Result};
use crate::core::llm::provider::{EnrichmentRequest, ProviderKind, TextProvider};
use crate::core::profile::EnrichmentResult;

pub struct HostedProvider {
    config: HostedConfig,
    secrets: Arc<dyn SecretStore>,
    client: Client,
}

impl HostedProvider {
    pub fn new(config: HostedConfig, secrets: Arc<dyn SecretStore>) -> std::result::Result<Self, reqwest::Error> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.timeout_secs.min(10)))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            config,
            secrets,
            client,
        })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn api_key(&self) -> Option<String> {
        match self.secrets.get_secret(&self.config.credential_key) {
            Ok(Some(key)) if !key.trim().is_empty() => Some(key),
            Ok(_) => None,
            Err(e) => {
                warn!(error = %e, "Failed to read hosted provider credential");
                None
            }
        }
    }

    fn max_tokens_for(&self, target_words: u32) -> u32 {
        let wanted = tokens_for_words(target_words);
        wanted.clamp(1, self.config.max_tokens.max(1))
    }

    async fn send(&self, api_key: &str, request: &EnrichmentRequest) -> Result<String> {
        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));

        let body = serde_json::json!({
            "model": self.config.model,
            "messages": [{
                "role": "user",
                "content": request.prompt.text
            }],
            "max_tokens": self.max_tokens_for(request.prompt.target_words),
            "temperature": self.config.temperature
        });

        let resp = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| GenerationError::from_reqwest(&e))?;

        let status = resp.status();
        if !status.is_success() {
            let err = error_for_status(status, resp.headers());
            let text = resp.text().await.unwrap_or_default();
            debug!(provider = "hosted", status = status.as_u16(), body = %truncate_for_log(&text), "Hosted provider error response");
            return Err(err);
        }

        let json: serde_json::Value = resp.json().await.map_err(|e| GenerationError::from_reqwest(&e))?;

        let content = json["choices"]
            .as_array()
            .and_then(|arr| arr.first())
            .and_then(|c| c["message"]["content"].as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                debug!(provider = "hosted", body = %truncate_for_log(&json.to_string()), "Hosted response without content");
                GenerationError::InvalidResponse("missing message content".to_string())
            })?;

        Ok(content.to_string())
    }
}

#[async_trait]
impl TextProvider for HostedProvider {
    fn id(&self) -> &'static str {
        "hosted"
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Hosted
    }

    async fn is_available(&self) -> bool {
        self.api_key().is_some()
    }

    async fn generate_enrichment(&self, request: &EnrichmentRequest) -> Result<EnrichmentResult> {
        let Some(api_key) = self.api_key() else {
            return Err(GenerationError::Unauthorized);
        };

        debug!(
            provider = "hosted",
            model = %self.config.model,
            variant = request.prompt.variant.as_str(),
            "Sending enrichment request"
        );

        let limit = Duration::from_secs(self.config.timeout_secs);
        let narrative = tokio::time::timeout(limit, self.send(&api_key, request))
            .await
            .map_err(|_| GenerationError::Timeout)??;

        Ok(EnrichmentResult::new(narrative))
    }
}

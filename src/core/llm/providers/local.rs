//! Local Provider Implementation
//!
//! Ollama-style generate endpoint running on the user's machine.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::{error_for_status, tokens_for_words, truncate_for_log};
use crate::config::LocalConfig;
use crate::core::llm::error::{GenerationError, Result};
use crate::core::llm::provider::{EnrichmentRequest, ProviderKind, TextProvider};
use crate::core::profile::EnrichmentResult;

pub struct LocalProvider {
    config: LocalConfig,
    client: Client,
}

impl LocalProvider {
    pub fn new(config: LocalConfig) -> std::result::Result<Self, reqwest::Error> {
        let client = Client::builder()
            .connect_timeout(Duration::from_millis(config.probe_timeout_ms.max(1)))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn host(&self) -> &str {
        self.config.host.trim_end_matches('/')
    }

    async fn send(&self, request: &EnrichmentRequest) -> Result<String> {
        let url = format!("{}/api/generate", self.host());

        let body = serde_json::json!({
            "model": self.config.model,
            "prompt": request.prompt.text,
            "stream": false,
            "options": {
                "temperature": self.config.temperature,
                "num_predict": tokens_for_words(request.prompt.target_words)
            }
        });

        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| GenerationError::from_reqwest(&e))?;

        let status = resp.status();
        if !status.is_success() {
            let err = error_for_status(status, resp.headers());
            let text = resp.text().await.unwrap_or_default();
            debug!(provider = "local", status = status.as_u16(), body = %truncate_for_log(&text), "Local provider error response");
            return Err(err);
        }

        let json: serde_json::Value = resp.json().await.map_err(|e| GenerationError::from_reqwest(&e))?;

        json["response"]
            .as_str()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .ok_or_else(|| {
                debug!(provider = "local", body = %truncate_for_log(&json.to_string()), "Local response without text");
                GenerationError::InvalidResponse("missing response text".to_string())
            })
    }
}

#[async_trait]
impl TextProvider for LocalProvider {
    fn id(&self) -> &'static str {
        "local"
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Local
    }

    async fn is_available(&self) -> bool {
        let url = format!("{}/api/tags", self.host());
        let probe = self.client.get(&url).send();
        match tokio::time::timeout(Duration::from_millis(self.config.probe_timeout_ms), probe).await {
            Ok(Ok(resp)) => resp.status().is_success(),
            _ => false,
        }
    }

    async fn generate_enrichment(&self, request: &EnrichmentRequest) -> Result<EnrichmentResult> {
        debug!(
            provider = "local",
            model = %self.config.model,
            variant = request.prompt.variant.as_str(),
            "Sending enrichment request"
        );

        let limit = Duration::from_secs(self.config.timeout_secs);
        let narrative = tokio::time::timeout(limit, self.send(request))
            .await
            .map_err(|_| GenerationError::Timeout)??;

        Ok(EnrichmentResult::new(narrative))
    }
}

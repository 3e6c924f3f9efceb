//! Text Provider Implementations

pub mod hosted;
pub mod local;

pub use hosted::HostedProvider;
pub use local::LocalProvider;

use std::sync::Arc;

use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use super::error::GenerationError;
use super::provider::{ProviderKind, TextProvider};
use crate::config::{HostedConfig, LocalConfig};
use crate::core::credentials::SecretStore;

/// Longest provider body excerpt written to debug logs
const LOG_BODY_LIMIT: usize = 512;

/// Rough tokens-per-word ratio used to size generation limits from a word target
const TOKENS_PER_WORD: f64 = 1.4;

pub(crate) fn tokens_for_words(target_words: u32) -> u32 {
    (target_words as f64 * TOKENS_PER_WORD).ceil() as u32
}

/// Construction parameters for a concrete backend
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderConfig {
    Hosted(HostedConfig),
    Local(LocalConfig),
}

impl ProviderConfig {
    pub fn kind(&self) -> ProviderKind {
        match self {
            ProviderConfig::Hosted(_) => ProviderKind::Hosted,
            ProviderConfig::Local(_) => ProviderKind::Local,
        }
    }

    pub fn create_provider(
        &self,
        secrets: Arc<dyn SecretStore>,
    ) -> Result<Arc<dyn TextProvider>, reqwest::Error> {
        Ok(match self {
            ProviderConfig::Hosted(config) => Arc::new(HostedProvider::new(config.clone(), secrets)?),
            ProviderConfig::Local(config) => Arc::new(LocalProvider::new(config.clone())?),
        })
    }
}

/// Map a non-success HTTP status to a generation error
pub(crate) fn error_for_status(status: StatusCode, headers: &HeaderMap) -> GenerationError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => GenerationError::Unauthorized,
        StatusCode::TOO_MANY_REQUESTS => GenerationError::RateLimited {
            retry_after_secs: headers
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse().ok()),
        },
        StatusCode::REQUEST_TIMEOUT => GenerationError::Timeout,
        s if s.is_server_error() => GenerationError::Unreachable(format!("server error {}", s.as_u16())),
        s => GenerationError::InvalidResponse(format!("unexpected status {}", s.as_u16())),
    }
}

/// Cut a body down to a log-safe excerpt on a char boundary
pub(crate) fn truncate_for_log(body: &str) -> &str {
    if body.len() <= LOG_BODY_LIMIT {
        return body;
    }
    let mut end = LOG_BODY_LIMIT;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}

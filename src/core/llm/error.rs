//! Generation Error Types
//!
//! Errors surfaced by text providers. Values never carry raw response bodies.

use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    #[error("Provider rejected credentials")]
    Unauthorized,

    #[error("Rate limited{}", .retry_after_secs.map(|s| format!(": retry after {s}s")).unwrap_or_default())]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("Provider unreachable: {0}")]
    Unreachable(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Request timeout")]
    Timeout,

    #[error("No text provider available")]
    NoProviderAvailable,
}

impl GenerationError {
    /// Whether another attempt could succeed without user intervention
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GenerationError::RateLimited { .. } | GenerationError::Unreachable(_) | GenerationError::Timeout
        )
    }

    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            GenerationError::RateLimited {
                retry_after_secs: Some(secs),
            } => Some(Duration::from_secs(*secs)),
            _ => None,
        }
    }

    /// Map a transport error. Timeouts and connection failures keep their meaning.
    pub fn from_reqwest(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            GenerationError::Timeout
        } else if err.is_connect() || err.is_request() {
            GenerationError::Unreachable(describe(err))
        } else if err.is_decode() || err.is_body() {
            GenerationError::InvalidResponse("unreadable response body".to_string())
        } else {
            GenerationError::Unreachable(describe(err))
        }
    }
}

fn describe(err: &reqwest::Error) -> String {
    match err.url() {
        Some(url) => format!("{}{}", url.host_str().unwrap_or("unknown host"), port_suffix(url)),
        None => "request failed".to_string(),
    }
}

fn port_suffix(url: &reqwest::Url) -> String {
    url.port().map(|p| format!(":{p}")).unwrap_or_default()
}

pub type Result<T> = std::result::Result<T, GenerationError>;

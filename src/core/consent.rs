//! User Consent
//!
//! Per-category consent decisions. Anything other than an explicit grant is
//! treated as a refusal by callers that gate on consent.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::database::StorageError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsentCategory {
    AiEnrichment,
    CloudSync,
    Analytics,
}

impl ConsentCategory {
    pub const ALL: [ConsentCategory; 3] = [
        ConsentCategory::AiEnrichment,
        ConsentCategory::CloudSync,
        ConsentCategory::Analytics,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ConsentCategory::AiEnrichment => "ai_enrichment",
            ConsentCategory::CloudSync => "cloud_sync",
            ConsentCategory::Analytics => "analytics",
        }
    }
}

impl fmt::Display for ConsentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsentStatus {
    Granted,
    Denied,
    #[default]
    Unknown,
}

impl ConsentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsentStatus::Granted => "granted",
            ConsentStatus::Denied => "denied",
            ConsentStatus::Unknown => "unknown",
        }
    }

    pub fn is_granted(&self) -> bool {
        matches!(self, ConsentStatus::Granted)
    }
}

impl fmt::Display for ConsentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown consent value: {0}")]
pub struct ParseConsentError(pub String);

impl FromStr for ConsentCategory {
    type Err = ParseConsentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        ConsentCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == normalized)
            .ok_or_else(|| ParseConsentError(s.to_string()))
    }
}

impl FromStr for ConsentStatus {
    type Err = ParseConsentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "granted" => Ok(ConsentStatus::Granted),
            "denied" => Ok(ConsentStatus::Denied),
            "unknown" | "not_asked" => Ok(ConsentStatus::Unknown),
            _ => Err(ParseConsentError(s.to_string())),
        }
    }
}

pub type ConsentMap = HashMap<ConsentCategory, ConsentStatus>;

/// Persistent consent decisions
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ConsentStore: Send + Sync {
    /// Missing decisions read as `Unknown`
    async fn get_status(&self, category: ConsentCategory) -> Result<ConsentStatus, StorageError>;

    /// Every category, including those never decided
    async fn get_all(&self) -> Result<ConsentMap, StorageError>;

    async fn set_status(&self, category: ConsentCategory, status: ConsentStatus) -> Result<(), StorageError>;

    /// Current map followed by a fresh map after every change
    fn observe_all(&self) -> BoxStream<'static, ConsentMap>;
}

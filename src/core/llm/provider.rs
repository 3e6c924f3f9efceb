//! Text Provider Trait
//!
//! Defines the interface every text-generation backend implements.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::error::Result;
use crate::core::enrichment::{EnrichmentContext, PromptText};
use crate::core::profile::EnrichmentResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    Hosted,
    Local,
    Combined,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Hosted => "hosted",
            ProviderKind::Local => "local",
            ProviderKind::Combined => "combined",
        }
    }
}

/// One generation request: the context it came from and the prompt built for it
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichmentRequest {
    pub context: EnrichmentContext,
    pub prompt: PromptText,
}

impl EnrichmentRequest {
    pub fn new(context: EnrichmentContext, prompt: PromptText) -> Self {
        Self { context, prompt }
    }
}

/// A text-generation backend
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TextProvider: Send + Sync {
    /// Stable identifier used in logs and outcomes
    fn id(&self) -> &'static str;

    fn kind(&self) -> ProviderKind;

    /// Cheap readiness check. Never errors; any failure reads as unavailable.
    async fn is_available(&self) -> bool;

    async fn generate_enrichment(&self, request: &EnrichmentRequest) -> Result<EnrichmentResult>;
}

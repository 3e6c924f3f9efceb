//! Provider Selection
//!
//! `CombinedProvider` reads the user's mode on every call and routes to the
//! hosted or local backend, falling back in order when a backend is down.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::error::{GenerationError, Result};
use super::provider::{EnrichmentRequest, ProviderKind, TextProvider};
use crate::core::profile::EnrichmentResult;
use crate::database::StorageError;

// ============================================================================
// Mode
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderMode {
    #[default]
    Auto,
    PreferRemote,
    PreferLocal,
    RemoteOnly,
    LocalOnly,
}

impl ProviderMode {
    pub const ALL: [ProviderMode; 5] = [
        ProviderMode::Auto,
        ProviderMode::PreferRemote,
        ProviderMode::PreferLocal,
        ProviderMode::RemoteOnly,
        ProviderMode::LocalOnly,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderMode::Auto => "auto",
            ProviderMode::PreferRemote => "prefer-remote",
            ProviderMode::PreferLocal => "prefer-local",
            ProviderMode::RemoteOnly => "remote-only",
            ProviderMode::LocalOnly => "local-only",
        }
    }
}

impl fmt::Display for ProviderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown provider mode: {0}")]
pub struct ParseModeError(pub String);

impl FromStr for ProviderMode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        ProviderMode::ALL
            .into_iter()
            .find(|m| m.as_str() == normalized)
            .ok_or_else(|| ParseModeError(s.to_string()))
    }
}

/// Which backend `Auto` tries first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutoPrimary {
    #[default]
    Remote,
    Local,
}

// ============================================================================
// Settings
// ============================================================================

/// Source of the persisted provider mode
#[async_trait]
pub trait ProviderSettings: Send + Sync {
    async fn provider_mode(&self) -> std::result::Result<ProviderMode, StorageError>;

    async fn set_provider_mode(&self, mode: ProviderMode) -> std::result::Result<(), StorageError>;
}

/// A fixed mode; writes are ignored
#[async_trait]
impl ProviderSettings for ProviderMode {
    async fn provider_mode(&self) -> std::result::Result<ProviderMode, StorageError> {
        Ok(*self)
    }

    async fn set_provider_mode(&self, _mode: ProviderMode) -> std::result::Result<(), StorageError> {
        Ok(())
    }
}

// ============================================================================
// Combined Provider
// ============================================================================

enum Route {
    /// Use this backend without probing
    Forced(usize),
    /// Probe in order, first available wins
    Ordered([usize; 2]),
}

const HOSTED: usize = 0;
const LOCAL: usize = 1;

pub struct CombinedProvider {
    backends: [Arc<dyn TextProvider>; 2],
    settings: Arc<dyn ProviderSettings>,
    default_mode: ProviderMode,
    auto_primary: AutoPrimary,
}

impl CombinedProvider {
    pub fn new(
        hosted: Arc<dyn TextProvider>,
        local: Arc<dyn TextProvider>,
        settings: Arc<dyn ProviderSettings>,
    ) -> Self {
        Self {
            backends: [hosted, local],
            settings,
            default_mode: ProviderMode::Auto,
            auto_primary: AutoPrimary::Remote,
        }
    }

    pub fn with_default_mode(mut self, mode: ProviderMode) -> Self {
        self.default_mode = mode;
        self
    }

    pub fn with_auto_primary(mut self, primary: AutoPrimary) -> Self {
        self.auto_primary = primary;
        self
    }

    /// Current mode, falling back to the configured default when settings can't be read
    pub async fn current_mode(&self) -> ProviderMode {
        match self.settings.provider_mode().await {
            Ok(mode) => mode,
            Err(e) => {
                warn!(error = %e, default = %self.default_mode, "Failed to read provider mode, using default");
                self.default_mode
            }
        }
    }

    fn route(&self, mode: ProviderMode) -> Route {
        match mode {
            ProviderMode::RemoteOnly => Route::Forced(HOSTED),
            ProviderMode::LocalOnly => Route::Forced(LOCAL),
            ProviderMode::PreferRemote => Route::Ordered([HOSTED, LOCAL]),
            ProviderMode::PreferLocal => Route::Ordered([LOCAL, HOSTED]),
            ProviderMode::Auto => match self.auto_primary {
                AutoPrimary::Remote => Route::Ordered([HOSTED, LOCAL]),
                AutoPrimary::Local => Route::Ordered([LOCAL, HOSTED]),
            },
        }
    }

    /// Pick the backend for this call. Never cached.
    pub async fn select(&self) -> Result<Arc<dyn TextProvider>> {
        let mode = self.current_mode().await;
        match self.route(mode) {
            Route::Forced(index) => {
                let provider = &self.backends[index];
                debug!(mode = %mode, provider = provider.id(), "Provider forced by mode");
                Ok(provider.clone())
            }
            Route::Ordered(order) => {
                for index in order {
                    let provider = &self.backends[index];
                    if provider.is_available().await {
                        debug!(mode = %mode, provider = provider.id(), "Selected available provider");
                        return Ok(provider.clone());
                    }
                    debug!(mode = %mode, provider = provider.id(), "Provider unavailable");
                }
                info!(mode = %mode, "No text provider available");
                Err(GenerationError::NoProviderAvailable)
            }
        }
    }
}

#[async_trait]
impl TextProvider for CombinedProvider {
    fn id(&self) -> &'static str {
        "combined"
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Combined
    }

    async fn is_available(&self) -> bool {
        for provider in &self.backends {
            if provider.is_available().await {
                return true;
            }
        }
        false
    }

    async fn generate_enrichment(&self, request: &EnrichmentRequest) -> Result<EnrichmentResult> {
        let provider = self.select().await?;
        provider.generate_enrichment(request).await
    }
}

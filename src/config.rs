use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::llm::{AutoPrimary, ProviderMode};

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub data: DataConfig,
    pub providers: ProvidersConfig,
    pub jobs: JobsConfig,
}

/// Data directory configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Override the default data directory.
    pub data_dir: Option<PathBuf>,
}

/// Text provider selection and backend settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    /// Mode used when the persisted setting can't be read.
    pub default_mode: ProviderMode,
    /// Backend tried first in `auto` mode.
    pub auto_primary: AutoPrimary,
    pub hosted: HostedConfig,
    pub local: LocalConfig,
}

/// OpenAI-compatible hosted endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostedConfig {
    pub base_url: String,
    pub model: String,
    /// Upper bound on `max_tokens`; the prompt's word target may ask for less.
    pub max_tokens: u32,
    pub temperature: f32,
    /// Secret store key holding the API key.
    pub credential_key: String,
    pub timeout_secs: u64,
}

/// Ollama-style local endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalConfig {
    pub host: String,
    pub model: String,
    pub temperature: f32,
    pub timeout_secs: u64,
    /// Budget for the `/api/tags` availability probe.
    pub probe_timeout_ms: u64,
}

/// Background job retry policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobsConfig {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for HostedConfig {
    fn default() -> Self {
        Self {
            base_url: "https://openrouter.ai/api/v1".to_string(),
            model: "openai/gpt-4o-mini".to_string(),
            max_tokens: 4096,
            temperature: 0.7,
            credential_key: "hosted_api_key".to_string(),
            timeout_secs: 120,
        }
    }
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            host: "http://localhost:11434".to_string(),
            model: "llama3".to_string(),
            temperature: 0.7,
            timeout_secs: 300,
            probe_timeout_ms: 1500,
        }
    }
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 2_000,
            max_backoff_ms: 60_000,
        }
    }
}

impl JobsConfig {
    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }
}

/// Where the loaded configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    Missing(PathBuf),
    Invalid { path: PathBuf, error: String },
}

impl ConfigSource {
    /// Report the load through `log`. Call after logging is initialized.
    pub fn log(&self) {
        match self {
            ConfigSource::File(path) => log::info!("Loaded config from {}", path.display()),
            ConfigSource::Missing(path) => log::debug!("No config file at {}, using defaults", path.display()),
            ConfigSource::Invalid { path, error } => {
                log::warn!("Failed to parse config at {}: {error}, using defaults", path.display())
            }
        }
    }
}

impl AppConfig {
    /// Load configuration from `~/.config/spirit-enrich/config.toml` without logging.
    /// Falls back to `Default` if the file is missing or unparseable.
    pub fn load() -> (Self, ConfigSource) {
        Self::resolve(&Self::config_path())
    }

    pub fn resolve(config_path: &std::path::Path) -> (Self, ConfigSource) {
        let path = config_path.to_path_buf();
        match std::fs::read_to_string(config_path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => (config, ConfigSource::File(path)),
                Err(e) => (
                    Self::default(),
                    ConfigSource::Invalid {
                        path,
                        error: e.to_string(),
                    },
                ),
            },
            Err(_) => (Self::default(), ConfigSource::Missing(path)),
        }
    }

    /// Load and log in one step, for callers whose logging is already up
    pub fn load_from(config_path: &std::path::Path) -> Self {
        let (config, source) = Self::resolve(config_path);
        source.log();
        config
    }

    /// Resolved data directory (override or XDG default).
    pub fn data_dir(&self) -> PathBuf {
        self.data.data_dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .map(|d| d.join("spirit-enrich"))
                .unwrap_or_else(|| PathBuf::from("data"))
        })
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join("spirit-enrich").join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }
}

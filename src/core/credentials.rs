//! Secure Credential Storage
//!
//! Provider API keys live in the system keychain. Callers go through the
//! [`SecretStore`] trait so tests and headless environments can swap in the
//! memory or environment backends.

use std::collections::HashMap;
use std::sync::RwLock;

use thiserror::Error;

#[cfg(feature = "keyring")]
const SERVICE_NAME: &str = "spirit-enrich";

// ============================================================================
// Error Types
// ============================================================================

#[derive(Error, Debug)]
pub enum CredentialError {
    #[cfg(feature = "keyring")]
    #[error("Keyring error: {0}")]
    KeyringError(#[from] keyring::Error),

    #[error("Credential store unavailable: {0}")]
    Unavailable(String),
}

pub type Result<T> = std::result::Result<T, CredentialError>;

// ============================================================================
// Secret Store
// ============================================================================

/// Key/value secret storage. A missing key is `Ok(None)`, not an error.
pub trait SecretStore: Send + Sync {
    fn get_secret(&self, key: &str) -> Result<Option<String>>;

    fn store_secret(&self, key: &str, value: &str) -> Result<()>;

    fn delete_secret(&self, key: &str) -> Result<()>;

    fn has_secret(&self, key: &str) -> bool {
        matches!(self.get_secret(key), Ok(Some(v)) if !v.is_empty())
    }
}

// ============================================================================
// Keychain Backend
// ============================================================================

#[cfg(feature = "keyring")]
pub struct CredentialManager {
    service: String,
}

#[cfg(feature = "keyring")]
impl Default for CredentialManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "keyring")]
impl CredentialManager {
    pub fn new() -> Self {
        Self {
            service: SERVICE_NAME.to_string(),
        }
    }
}

#[cfg(feature = "keyring")]
impl SecretStore for CredentialManager {
    fn get_secret(&self, key: &str) -> Result<Option<String>> {
        let entry = keyring::Entry::new(&self.service, key)?;
        match entry.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(CredentialError::KeyringError(e)),
        }
    }

    fn store_secret(&self, key: &str, value: &str) -> Result<()> {
        let entry = keyring::Entry::new(&self.service, key)?;
        entry.set_password(value)?;
        log::info!("Stored secret for key: {}", key);
        Ok(())
    }

    fn delete_secret(&self, key: &str) -> Result<()> {
        let entry = keyring::Entry::new(&self.service, key)?;
        match entry.delete_password() {
            Ok(()) => {
                log::info!("Deleted secret for key: {}", key);
                Ok(())
            }
            Err(keyring::Error::NoEntry) => Ok(()), // Already deleted
            Err(e) => Err(CredentialError::KeyringError(e)),
        }
    }
}

// ============================================================================
// Environment Backend
// ============================================================================

/// Read-only secrets from environment variables, `SPIRIT_ENRICH_<KEY>`
pub struct EnvSecretStore {
    prefix: String,
}

impl Default for EnvSecretStore {
    fn default() -> Self {
        Self {
            prefix: "SPIRIT_ENRICH_".to_string(),
        }
    }
}

impl EnvSecretStore {
    pub fn var_name(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key.to_ascii_uppercase())
    }
}

impl SecretStore for EnvSecretStore {
    fn get_secret(&self, key: &str) -> Result<Option<String>> {
        Ok(std::env::var(self.var_name(key)).ok())
    }

    fn store_secret(&self, key: &str, _value: &str) -> Result<()> {
        Err(CredentialError::Unavailable(format!(
            "environment store is read-only, set {}",
            self.var_name(key)
        )))
    }

    fn delete_secret(&self, _key: &str) -> Result<()> {
        Ok(())
    }
}

// ============================================================================
// Memory Backend
// ============================================================================

#[derive(Default)]
pub struct MemorySecretStore {
    secrets: RwLock<HashMap<String, String>>,
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_secret(key: &str, value: &str) -> Self {
        let store = Self::default();
        if let Ok(mut map) = store.secrets.write() {
            map.insert(key.to_string(), value.to_string());
        }
        store
    }
}

impl SecretStore for MemorySecretStore {
    fn get_secret(&self, key: &str) -> Result<Option<String>> {
        let map = self
            .secrets
            .read()
            .map_err(|_| CredentialError::Unavailable("lock poisoned".to_string()))?;
        Ok(map.get(key).cloned())
    }

    fn store_secret(&self, key: &str, value: &str) -> Result<()> {
        let mut map = self
            .secrets
            .write()
            .map_err(|_| CredentialError::Unavailable("lock poisoned".to_string()))?;
        map.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete_secret(&self, key: &str) -> Result<()> {
        let mut map = self
            .secrets
            .write()
            .map_err(|_| CredentialError::Unavailable("lock poisoned".to_string()))?;
        map.remove(key);
        Ok(())
    }
}

/// Keychain when the feature is on, environment variables otherwise
pub fn default_store() -> Box<dyn SecretStore> {
    #[cfg(feature = "keyring")]
    {
        Box::new(CredentialManager::new())
    }
    #[cfg(not(feature = "keyring"))]
    {
        Box::new(EnvSecretStore::default())
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Mask an API key for display (show first 4 and last 4 chars)
pub fn mask_api_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        return "********".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}

/// Validate an API key format for the hosted endpoint
pub fn validate_api_key(key: &str) -> bool {
    let key = key.trim();
    if key.is_empty() || key.chars().any(char::is_whitespace) {
        return false;
    }
    // OpenRouter and OpenAI style keys
    key.starts_with("sk-") || key.len() >= 20
}

//! Settings database operations
//!
//! Key-value settings storage, and the persisted provider mode on top of it.

use async_trait::async_trait;
use sqlx::Row;
use tracing::warn;

use super::{Database, StorageError};
use crate::core::llm::{ProviderMode, ProviderSettings};

pub const PROVIDER_MODE_KEY: &str = "provider_mode";

/// Extension trait for settings database operations
pub trait SettingsOps {
    fn get_setting(&self, key: &str) -> impl std::future::Future<Output = Result<Option<String>, sqlx::Error>> + Send;
    fn set_setting(&self, key: &str, value: &str) -> impl std::future::Future<Output = Result<(), sqlx::Error>> + Send;
    fn delete_setting(&self, key: &str) -> impl std::future::Future<Output = Result<(), sqlx::Error>> + Send;
}

impl SettingsOps for Database {
    async fn get_setting(&self, key: &str) -> Result<Option<String>, sqlx::Error> {
        let row = sqlx::query("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(self.pool())
            .await?;

        Ok(row.map(|r| r.get("value")))
    }

    async fn set_setting(&self, key: &str, value: &str) -> Result<(), sqlx::Error> {
        sqlx::query("INSERT OR REPLACE INTO settings (key, value, updated_at) VALUES (?, ?, datetime('now'))")
            .bind(key)
            .bind(value)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    async fn delete_setting(&self, key: &str) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM settings WHERE key = ?")
            .bind(key)
            .execute(self.pool())
            .await?;
        Ok(())
    }
}

#[async_trait]
impl ProviderSettings for Database {
    /// Unset reads as `Auto`; an unrecognised stored value is a corrupt record
    async fn provider_mode(&self) -> Result<ProviderMode, StorageError> {
        match self.get_setting(PROVIDER_MODE_KEY).await? {
            None => Ok(ProviderMode::default()),
            Some(raw) => raw.parse().map_err(|e| {
                warn!(value = %raw, "Unrecognised stored provider mode");
                StorageError::corrupt(format!("{e}"))
            }),
        }
    }

    async fn set_provider_mode(&self, mode: ProviderMode) -> Result<(), StorageError> {
        self.set_setting(PROVIDER_MODE_KEY, mode.as_str()).await?;
        Ok(())
    }
}

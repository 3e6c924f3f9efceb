//! Storage errors shared by the profile, consent and settings tables.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    /// A row that must exist is gone, e.g. re-reading a profile right after saving it
    #[error("Missing row: {0}")]
    NotFound(String),

    /// A stored value could not be decoded back into its model type
    #[error("Corrupt row: {0}")]
    Corrupt(String),

    #[error("Field encoding failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Data directory error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    pub fn migration(msg: impl Into<String>) -> Self {
        Self::Migration(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn corrupt(msg: impl Into<String>) -> Self {
        Self::Corrupt(msg.into())
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

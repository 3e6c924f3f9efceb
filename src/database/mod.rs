//! SQLite Database Module
//!
//! Profile, consent and settings storage. Every operation is a single
//! statement or a single transaction; change notifications go out on an
//! in-process broadcast channel after commit.

mod consent;
mod error;
mod migrations;
mod profiles;
mod settings;

pub use error::{StorageError, StorageResult};
pub use migrations::{run_migrations, SCHEMA_VERSION};
pub use profiles::ProfileRecord;
pub use settings::{SettingsOps, PROVIDER_MODE_KEY};

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tokio::sync::broadcast;
use tracing::info;

const DB_FILE_NAME: &str = "spirit_enrich.db";
const EVENT_CAPACITY: usize = 64;

/// A committed change, delivered to observers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    ProfileSaved(String),
    ProfileDeleted(String),
    ConsentChanged,
}

/// Database connection pool
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
    path: PathBuf,
    events: broadcast::Sender<StoreEvent>,
}

impl Database {
    /// Open (creating if needed) the database file under `data_dir`
    pub async fn new(data_dir: &Path) -> StorageResult<Self> {
        let db_path = data_dir.join(DB_FILE_NAME);

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}?mode=rwc", db_path.display()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(30));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .min_connections(1)
            .connect_with(options)
            .await?;

        info!(path = %db_path.display(), "Opened database");
        Self::with_pool(pool, db_path).await
    }

    /// Single-connection memory database. The connection is never recycled,
    /// so the data lives as long as the pool.
    pub async fn in_memory() -> StorageResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        Self::with_pool(pool, PathBuf::from(":memory:")).await
    }

    async fn with_pool(pool: SqlitePool, path: PathBuf) -> StorageResult<Self> {
        run_migrations(&pool)
            .await
            .map_err(|e| StorageError::migration(e.to_string()))?;

        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Ok(Self { pool, path, events })
    }

    /// Get the underlying pool for direct queries
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Get database file path
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    pub(crate) fn notify(&self, event: StoreEvent) {
        // No receivers is fine
        let _ = self.events.send(event);
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// Fixed-width UTC text so that string order matches time order
pub(crate) fn encode_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn decode_timestamp(raw: &str) -> StorageResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StorageError::corrupt(format!("timestamp '{raw}': {e}")))
}

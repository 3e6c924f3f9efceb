//! Schema bootstrap
//!
//! Linear, versioned migrations. Each version is applied once, inside its own
//! transaction, and recorded in `_migrations`.

use sqlx::sqlite::SqlitePool;
use sqlx::Row;
use tracing::{info, warn};

/// v1: settings + profiles, v2: consent
pub const SCHEMA_VERSION: i32 = 2;

/// Bring the schema up to [`SCHEMA_VERSION`]
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS _migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    let current_version = get_current_version(pool).await?;

    info!(current_version, target_version = SCHEMA_VERSION, "Checking schema version");

    if current_version < SCHEMA_VERSION {
        info!(from = current_version, to = SCHEMA_VERSION, "Migrating schema");

        for version in (current_version + 1)..=SCHEMA_VERSION {
            run_migration(pool, version).await?;
        }

        info!("Schema up to date");
    }

    Ok(())
}

/// Highest applied version, 0 on a fresh database
pub async fn get_current_version(pool: &SqlitePool) -> Result<i32, sqlx::Error> {
    let result = sqlx::query("SELECT MAX(version) as version FROM _migrations")
        .fetch_optional(pool)
        .await?;

    Ok(result
        .and_then(|row| row.try_get::<i32, _>("version").ok())
        .unwrap_or(0))
}

/// Run a specific migration version inside one transaction
async fn run_migration(pool: &SqlitePool, version: i32) -> Result<(), sqlx::Error> {
    let (name, sql) = match version {
        1 => ("profiles_and_settings", MIGRATION_V1),
        2 => ("consent", MIGRATION_V2),
        _ => {
            warn!("Unknown migration version: {}", version);
            return Ok(());
        }
    };

    info!("Applying migration v{}: {}", version, name);

    let mut tx = pool.begin().await?;

    for statement in sql.split(';').filter(|s| !s.trim().is_empty()) {
        sqlx::query(statement.trim()).execute(&mut *tx).await?;
    }

    sqlx::query("INSERT INTO _migrations (version, name) VALUES (?, ?)")
        .bind(version)
        .bind(name)
        .execute(&mut *tx)
        .await?;

    tx.commit().await
}

/// Migration v1: Profiles and key-value settings
const MIGRATION_V1: &str = r#"
CREATE TABLE IF NOT EXISTS settings (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- Enrichment text and timestamp are set together or not at all
CREATE TABLE IF NOT EXISTS profiles (
    id TEXT PRIMARY KEY,
    profile_name TEXT NOT NULL,
    full_name TEXT,
    display_name TEXT,
    created_at TEXT NOT NULL,
    last_modified TEXT NOT NULL,
    fields_json TEXT NOT NULL DEFAULT '{}',
    completion_tier INTEGER NOT NULL DEFAULT 0,
    completion_filled INTEGER NOT NULL DEFAULT 0,
    completion_total INTEGER NOT NULL DEFAULT 0,
    completion_score REAL NOT NULL DEFAULT 0,
    enrichment_result TEXT,
    enrichment_generated_at TEXT,
    sync_status TEXT NOT NULL DEFAULT 'local',
    CHECK ((enrichment_result IS NULL) = (enrichment_generated_at IS NULL))
);

CREATE INDEX IF NOT EXISTS idx_profiles_modified ON profiles(last_modified DESC)
"#;

/// Migration v2: Per-category consent
const MIGRATION_V2: &str = r#"
CREATE TABLE IF NOT EXISTS consent (
    category TEXT PRIMARY KEY,
    status TEXT NOT NULL,
    updated_at TEXT NOT NULL
)
"#;

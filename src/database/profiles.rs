//! Profile database operations
//!
//! Field saves and enrichment writes touch disjoint column sets, so a field
//! edit made while a job is generating is never overwritten by the job.

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use super::{decode_timestamp, encode_timestamp, Database, StorageError, StorageResult, StoreEvent};
use crate::core::profile::{
    compute, EnrichmentResult, Profile, ProfileCompletion, ProfileFields, ProfileStore, SyncStatus, Tier,
};

/// Profile row as stored
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProfileRecord {
    pub id: String,
    pub profile_name: String,
    pub full_name: Option<String>,
    pub display_name: Option<String>,
    pub created_at: String,
    pub last_modified: String,
    pub fields_json: String,
    pub completion_tier: i64,
    pub completion_filled: i64,
    pub completion_total: i64,
    pub completion_score: f64,
    pub enrichment_result: Option<String>,
    pub enrichment_generated_at: Option<String>,
    pub sync_status: String,
}

impl ProfileRecord {
    /// Decode into the domain type. Completion is recomputed from the fields,
    /// the stored columns only serve queries.
    pub fn into_profile(self) -> StorageResult<Profile> {
        let fields: ProfileFields = serde_json::from_str(&self.fields_json)?;
        let completion = compute(&fields);

        if Tier::from_level(self.completion_tier as u8) != Some(completion.tier) {
            debug!(profile_id = %self.id, stored = self.completion_tier, "Stored completion tier is stale");
        }

        let enrichment = match (self.enrichment_result, self.enrichment_generated_at) {
            (Some(narrative), Some(at)) => Some(EnrichmentResult::at(narrative, decode_timestamp(&at)?)),
            (None, None) => None,
            _ => return Err(StorageError::corrupt(format!("profile {} has half an enrichment", self.id))),
        };

        Ok(Profile {
            id: self.id,
            profile_name: self.profile_name,
            created_at: decode_timestamp(&self.created_at)?,
            last_modified: decode_timestamp(&self.last_modified)?,
            fields,
            completion,
            enrichment,
            sync_status: SyncStatus::parse(&self.sync_status),
        })
    }
}

const SELECT_COLUMNS: &str = "SELECT id, profile_name, full_name, display_name, created_at, last_modified, \
     fields_json, completion_tier, completion_filled, completion_total, completion_score, \
     enrichment_result, enrichment_generated_at, sync_status FROM profiles";

fn escape_like(query: &str) -> String {
    let mut out = String::with_capacity(query.len() + 2);
    out.push('%');
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('%');
    out
}

impl Database {
    async fn fetch_profile(&self, id: &str) -> StorageResult<Option<Profile>> {
        let record = sqlx::query_as::<_, ProfileRecord>(&format!("{SELECT_COLUMNS} WHERE id = ?"))
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        record.map(ProfileRecord::into_profile).transpose()
    }

    fn completion_columns(completion: &ProfileCompletion) -> (i64, i64, i64, f64) {
        (
            completion.tier.level() as i64,
            completion.filled_field_count as i64,
            completion.total_field_count as i64,
            completion.score,
        )
    }
}

#[async_trait]
impl ProfileStore for Database {
    async fn get(&self, id: &str) -> StorageResult<Option<Profile>> {
        self.fetch_profile(id).await
    }

    async fn get_latest(&self) -> StorageResult<Option<Profile>> {
        let record = sqlx::query_as::<_, ProfileRecord>(&format!(
            "{SELECT_COLUMNS} ORDER BY last_modified DESC LIMIT 1"
        ))
        .fetch_optional(self.pool())
        .await?;
        record.map(ProfileRecord::into_profile).transpose()
    }

    async fn save(&self, profile: &Profile) -> StorageResult<Profile> {
        let completion = compute(&profile.fields);
        let fields_json = serde_json::to_string(&profile.fields)?;
        let now = chrono::Utc::now();
        let (tier, filled, total, score) = Self::completion_columns(&completion);

        // enrichment_* columns belong to store_enrichment
        sqlx::query(
            r#"
            INSERT INTO profiles (
                id, profile_name, full_name, display_name, created_at, last_modified,
                fields_json, completion_tier, completion_filled, completion_total, completion_score,
                sync_status
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                profile_name = excluded.profile_name,
                full_name = excluded.full_name,
                display_name = excluded.display_name,
                last_modified = excluded.last_modified,
                fields_json = excluded.fields_json,
                completion_tier = excluded.completion_tier,
                completion_filled = excluded.completion_filled,
                completion_total = excluded.completion_total,
                completion_score = excluded.completion_score,
                sync_status = excluded.sync_status
            "#,
        )
        .bind(&profile.id)
        .bind(&profile.profile_name)
        .bind(&profile.fields.name)
        .bind(&profile.fields.display_name)
        .bind(encode_timestamp(&profile.created_at))
        .bind(encode_timestamp(&now))
        .bind(&fields_json)
        .bind(tier)
        .bind(filled)
        .bind(total)
        .bind(score)
        .bind(SyncStatus::Local.as_str())
        .execute(self.pool())
        .await?;

        debug!(profile_id = %profile.id, tier = %completion.tier, filled, "Saved profile");
        self.notify(StoreEvent::ProfileSaved(profile.id.clone()));

        self.fetch_profile(&profile.id)
            .await?
            .ok_or_else(|| StorageError::not_found(format!("profile:{}", profile.id)))
    }

    async fn store_enrichment(&self, id: &str, result: &EnrichmentResult) -> StorageResult<bool> {
        let generated_at = encode_timestamp(&result.generated_at);

        let applied = sqlx::query(
            r#"
            UPDATE profiles
            SET enrichment_result = ?, enrichment_generated_at = ?
            WHERE id = ? AND (enrichment_generated_at IS NULL OR enrichment_generated_at < ?)
            "#,
        )
        .bind(&result.narrative)
        .bind(&generated_at)
        .bind(id)
        .bind(&generated_at)
        .execute(self.pool())
        .await?
        .rows_affected()
            > 0;

        if applied {
            info!(profile_id = %id, generated_at = %generated_at, "Stored enrichment");
            self.notify(StoreEvent::ProfileSaved(id.to_string()));
        } else {
            warn!(profile_id = %id, "Enrichment not applied: profile missing or newer result stored");
        }
        Ok(applied)
    }

    async fn delete(&self, id: &str) -> StorageResult<bool> {
        let deleted = sqlx::query("DELETE FROM profiles WHERE id = ?")
            .bind(id)
            .execute(self.pool())
            .await?
            .rows_affected()
            > 0;

        if deleted {
            info!(profile_id = %id, "Deleted profile");
            self.notify(StoreEvent::ProfileDeleted(id.to_string()));
        }
        Ok(deleted)
    }

    async fn search(&self, query: &str) -> StorageResult<Vec<Profile>> {
        let query = query.trim();
        let records = if query.is_empty() {
            sqlx::query_as::<_, ProfileRecord>(&format!("{SELECT_COLUMNS} ORDER BY last_modified DESC"))
                .fetch_all(self.pool())
                .await?
        } else {
            let pattern = escape_like(query);
            sqlx::query_as::<_, ProfileRecord>(&format!(
                "{SELECT_COLUMNS} WHERE profile_name LIKE ?1 ESCAPE '\\' \
                 OR full_name LIKE ?1 ESCAPE '\\' \
                 OR display_name LIKE ?1 ESCAPE '\\' \
                 ORDER BY last_modified DESC"
            ))
            .bind(&pattern)
            .fetch_all(self.pool())
            .await?
        };

        records.into_iter().map(ProfileRecord::into_profile).collect()
    }

    async fn count(&self) -> StorageResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM profiles")
            .fetch_one(self.pool())
            .await?;
        Ok(count.max(0) as u64)
    }

    fn observe(&self, id: &str) -> BoxStream<'static, Profile> {
        let db = self.clone();
        let id = id.to_string();
        let mut events = self.subscribe();

        async_stream::stream! {
            match db.fetch_profile(&id).await {
                Ok(Some(profile)) => yield profile,
                Ok(None) => return,
                Err(e) => {
                    warn!(profile_id = %id, error = %e, "Failed to read profile snapshot");
                    return;
                }
            }

            loop {
                let changed = match events.recv().await {
                    Ok(StoreEvent::ProfileSaved(changed)) => changed == id,
                    Ok(StoreEvent::ProfileDeleted(deleted)) if deleted == id => break,
                    Ok(_) => false,
                    Err(RecvError::Lagged(_)) => true,
                    Err(RecvError::Closed) => break,
                };
                if !changed {
                    continue;
                }
                match db.fetch_profile(&id).await {
                    Ok(Some(profile)) => yield profile,
                    Ok(None) => break,
                    Err(e) => warn!(profile_id = %id, error = %e, "Failed to re-read profile"),
                }
            }
        }
        .boxed()
    }
}

//! Consent database operations

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use sqlx::Row;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use super::{encode_timestamp, Database, StorageError, StoreEvent};
use crate::core::consent::{ConsentCategory, ConsentMap, ConsentStatus, ConsentStore};

#[async_trait]
impl ConsentStore for Database {
    async fn get_status(&self, category: ConsentCategory) -> Result<ConsentStatus, StorageError> {
        let row = sqlx::query("SELECT status FROM consent WHERE category = ?")
            .bind(category.as_str())
            .fetch_optional(self.pool())
            .await?;

        Ok(match row {
            Some(r) => {
                let raw: String = r.get("status");
                raw.parse().unwrap_or_else(|_| {
                    warn!(category = %category, value = %raw, "Unrecognised consent status, treating as unknown");
                    ConsentStatus::Unknown
                })
            }
            None => ConsentStatus::Unknown,
        })
    }

    async fn get_all(&self) -> Result<ConsentMap, StorageError> {
        let rows = sqlx::query("SELECT category, status FROM consent")
            .fetch_all(self.pool())
            .await?;

        let mut map: ConsentMap = ConsentCategory::ALL
            .into_iter()
            .map(|c| (c, ConsentStatus::Unknown))
            .collect();

        for row in rows {
            let category: String = row.get("category");
            let status: String = row.get("status");
            match (category.parse(), status.parse()) {
                (Ok(c), Ok(s)) => {
                    map.insert(c, s);
                }
                _ => debug!(category = %category, status = %status, "Skipping unrecognised consent row"),
            }
        }

        Ok(map)
    }

    async fn set_status(&self, category: ConsentCategory, status: ConsentStatus) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO consent (category, status, updated_at) VALUES (?, ?, ?)
            ON CONFLICT(category) DO UPDATE SET status = excluded.status, updated_at = excluded.updated_at
            "#,
        )
        .bind(category.as_str())
        .bind(status.as_str())
        .bind(encode_timestamp(&chrono::Utc::now()))
        .execute(self.pool())
        .await?;

        info!(category = %category, status = %status, "Consent updated");
        self.notify(StoreEvent::ConsentChanged);
        Ok(())
    }

    fn observe_all(&self) -> BoxStream<'static, ConsentMap> {
        let db = self.clone();
        let mut events = self.subscribe();

        async_stream::stream! {
            match db.get_all().await {
                Ok(map) => yield map,
                Err(e) => {
                    warn!(error = %e, "Failed to read consent snapshot");
                    return;
                }
            }

            loop {
                match events.recv().await {
                    Ok(StoreEvent::ConsentChanged) | Err(RecvError::Lagged(_)) => match db.get_all().await {
                        Ok(map) => yield map,
                        Err(e) => warn!(error = %e, "Failed to re-read consent"),
                    },
                    Ok(_) => continue,
                    Err(RecvError::Closed) => break,
                }
            }
        }
        .boxed()
    }
}

//! Profile persistence interface

use async_trait::async_trait;
use futures::stream::BoxStream;

use super::{EnrichmentResult, Profile};
use crate::database::StorageError;

pub type StoreResult<T> = std::result::Result<T, StorageError>;

/// Persistent profile records.
///
/// `save` writes identity and field columns only; `store_enrichment` writes
/// the enrichment columns only. Neither touches what the other owns.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get(&self, id: &str) -> StoreResult<Option<Profile>>;

    /// Most recently modified profile, if any
    async fn get_latest(&self) -> StoreResult<Option<Profile>>;

    /// Insert or update. Completion is recomputed from the fields before writing.
    async fn save(&self, profile: &Profile) -> StoreResult<Profile>;

    /// Attach an enrichment result. Returns false when the stored result is
    /// already as new or newer, or when the profile no longer exists.
    async fn store_enrichment(&self, id: &str, result: &EnrichmentResult) -> StoreResult<bool>;

    async fn delete(&self, id: &str) -> StoreResult<bool>;

    async fn search(&self, query: &str) -> StoreResult<Vec<Profile>>;

    async fn count(&self) -> StoreResult<u64>;

    /// Current snapshot followed by every later change; ends on delete
    fn observe(&self, id: &str) -> BoxStream<'static, Profile>;
}

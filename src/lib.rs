/// spirit-enrich - Spiritual Profile Enrichment Pipeline
///
/// Core library providing profile completion scoring, tiered prompt
/// construction, hosted/local text provider selection, and consent-gated
/// background enrichment jobs over SQLite storage.

pub mod config;
pub mod core;
pub mod database;


pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");

pub use crate::core::jobs::{EnrichmentJob, EnrichmentScheduler, JobOutcome, JobState};
pub use crate::core::llm::{CombinedProvider, ProviderMode, TextProvider};
pub use crate::core::profile::{Profile, ProfileFields, Tier};
pub use crate::database::Database;

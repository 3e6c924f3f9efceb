//! Background enrichment jobs
//!
//! `EnrichmentJob` runs one consent-gated attempt; `EnrichmentScheduler`
//! owns dedupe, retries and cancellation around it.

pub mod error;
pub mod outcome;
pub mod scheduler;
pub mod worker;

pub use error::EnrichmentError;
pub use outcome::{FailureKind, JobOutcome, JobState};
pub use scheduler::{EnrichmentScheduler, JobTicket, RetryPolicy};
pub use worker::EnrichmentJob;

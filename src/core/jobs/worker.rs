//! Enrichment Job
//!
//! One attempt at enriching one profile. Reads are request/response; the only
//! write is the guarded enrichment update at the very end.

use std::sync::Arc;

use chrono::{Duration as ChronoDuration, SubsecRound};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::error::{EnrichmentError, Result};
use super::outcome::{FailureKind, JobOutcome};
use crate::core::consent::{ConsentCategory, ConsentStore};
use crate::core::enrichment::{EnrichmentContext, PromptBuilder, PromptVariant};
use crate::core::llm::{EnrichmentRequest, TextProvider};
use crate::core::profile::{EnrichmentResult, ProfileStore, Tier};

struct Completed {
    tier: Tier,
    variant: PromptVariant,
    words: usize,
    /// False when a newer enrichment was already stored and this one was dropped
    stored: bool,
}

pub struct EnrichmentJob {
    profiles: Arc<dyn ProfileStore>,
    consent: Arc<dyn ConsentStore>,
    provider: Arc<dyn TextProvider>,
}

impl EnrichmentJob {
    pub fn new(
        profiles: Arc<dyn ProfileStore>,
        consent: Arc<dyn ConsentStore>,
        provider: Arc<dyn TextProvider>,
    ) -> Self {
        Self {
            profiles,
            consent,
            provider,
        }
    }

    /// Run a single attempt
    pub async fn run(&self, profile_id: &str, cancel: &CancellationToken) -> JobOutcome {
        self.run_attempt(profile_id, 1, cancel).await
    }

    #[instrument(skip(self, cancel), fields(provider = self.provider.id()))]
    pub async fn run_attempt(&self, profile_id: &str, attempt: u32, cancel: &CancellationToken) -> JobOutcome {
        match self.execute(profile_id, cancel).await {
            Ok(done) if done.stored => {
                info!(tier = %done.tier, words = done.words, "Enrichment completed");
                JobOutcome::success(
                    profile_id,
                    attempt,
                    done.tier,
                    format!("Generated {} enrichment ({} words)", done.variant.as_str(), done.words),
                )
            }
            Ok(done) => {
                info!(tier = %done.tier, "Enrichment discarded, a newer result is stored");
                JobOutcome::superseded(
                    profile_id,
                    attempt,
                    done.tier,
                    format!(
                        "Discarded {} enrichment, a newer enrichment is already stored",
                        done.variant.as_str()
                    ),
                )
            }
            Err(e) => {
                let kind = e.kind();
                match kind {
                    FailureKind::ConsentDenied | FailureKind::Cancelled => info!(failure = ?kind, "Enrichment not run"),
                    _ if kind.is_retryable() => warn!(failure = ?kind, error = %e, "Enrichment attempt failed"),
                    _ => warn!(failure = ?kind, error = %e, "Enrichment failed permanently"),
                }
                JobOutcome::failure(profile_id, attempt, kind).with_retry_after(e.retry_after())
            }
        }
    }

    async fn execute(&self, profile_id: &str, cancel: &CancellationToken) -> Result<Completed> {
        if cancel.is_cancelled() {
            return Err(EnrichmentError::Cancelled);
        }

        let consent = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(EnrichmentError::Cancelled),
            status = self.consent.get_status(ConsentCategory::AiEnrichment) => status?,
        };
        if !consent.is_granted() {
            debug!(status = %consent, "Consent not granted");
            return Err(EnrichmentError::ConsentDenied);
        }

        let profile = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(EnrichmentError::Cancelled),
            profile = self.profiles.get(profile_id) => profile?,
        };
        let profile = profile.ok_or_else(|| EnrichmentError::ProfileNotFound(profile_id.to_string()))?;

        let context = EnrichmentContext::from_profile(&profile);
        let tier = context.tier;
        let prompt = PromptBuilder::build(&context, tier);
        let variant = prompt.variant;
        debug!(
            %tier,
            filled = context.filled_fields,
            keys = context.len(),
            target_words = prompt.target_words,
            "Built enrichment prompt"
        );

        let request = EnrichmentRequest::new(context, prompt);
        let generated = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(EnrichmentError::Cancelled),
            result = self.provider.generate_enrichment(&request) => result?,
        };

        if cancel.is_cancelled() {
            return Err(EnrichmentError::Cancelled);
        }

        let prior = profile.enrichment.as_ref().map(|e| e.generated_at);
        let result = strictly_after(generated, prior);
        let words = result.narrative.split_whitespace().count();

        let stored = self.profiles.store_enrichment(profile_id, &result).await?;
        // Either deleted mid-job or a newer result landed first
        if !stored && self.profiles.get(profile_id).await?.is_none() {
            return Err(EnrichmentError::ProfileNotFound(profile_id.to_string()));
        }

        Ok(Completed {
            tier,
            variant,
            words,
            stored,
        })
    }
}

/// Push `generated_at` past any prior result so stored timestamps keep increasing.
/// Compared at microsecond precision, the resolution timestamps are stored with.
fn strictly_after(result: EnrichmentResult, prior: Option<chrono::DateTime<chrono::Utc>>) -> EnrichmentResult {
    match prior {
        Some(prior) if result.generated_at.trunc_subsecs(6) <= prior => {
            EnrichmentResult::at(result.narrative, prior + ChronoDuration::milliseconds(1))
        }
        _ => result,
    }
}

//! Enrichment Job Unit Tests
//!
//! Single-attempt behaviour against an in-memory database and a scripted
//! provider: consent gating, failure classification, cancellation and the
//! guarded write.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use tokio_util::sync::CancellationToken;

use crate::core::consent::{ConsentStatus, MockConsentStore};
use crate::core::jobs::{EnrichmentJob, FailureKind, JobState};
use crate::core::llm::GenerationError;
use crate::core::profile::store::MockProfileStore;
use crate::core::profile::{EnrichmentResult, ProfileStore, Tier};
use crate::database::StorageError;
use crate::tests::common::{create_db_with, create_test_db, detailed_profile, master_profile, ScriptedProvider};

// =============================================================================
// Consent and Lookup
// =============================================================================

#[tokio::test]
async fn test_consent_denied_never_calls_provider() {
    for status in [ConsentStatus::Denied, ConsentStatus::Unknown] {
        let db = create_test_db(status).await;
        let profile = detailed_profile();
        db.save(&profile).await.unwrap();
        let provider = ScriptedProvider::hosted().arc();

        let job = EnrichmentJob::new(db.clone(), db.clone(), provider.clone());
        let outcome = job.run(&profile.id, &CancellationToken::new()).await;

        assert_eq!(outcome.failure, Some(FailureKind::ConsentDenied));
        assert_eq!(outcome.state, JobState::PermanentFailure);
        assert!(!outcome.needs_attention);
        assert_eq!(provider.calls(), 0);
        assert!(db.get(&profile.id).await.unwrap().unwrap().enrichment.is_none());
    }
}

#[tokio::test]
async fn test_missing_profile_is_permanent() {
    let db = create_test_db(ConsentStatus::Granted).await;
    let provider = ScriptedProvider::hosted().arc();

    let job = EnrichmentJob::new(db.clone(), db.clone(), provider.clone());
    let outcome = job.run("no-such-profile", &CancellationToken::new()).await;

    assert_eq!(outcome.failure, Some(FailureKind::ProfileNotFound));
    assert_eq!(outcome.state, JobState::PermanentFailure);
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn test_storage_read_failure_is_retryable() {
    let mut consent = MockConsentStore::new();
    consent.expect_get_status().returning(|_| Ok(ConsentStatus::Granted));
    let mut profiles = MockProfileStore::new();
    profiles
        .expect_get()
        .returning(|_| Err(StorageError::corrupt("bad row")));
    profiles.expect_store_enrichment().never();
    let provider = ScriptedProvider::hosted().arc();

    let job = EnrichmentJob::new(Arc::new(profiles), Arc::new(consent), provider.clone());
    let outcome = job.run("p-1", &CancellationToken::new()).await;

    assert_eq!(outcome.failure, Some(FailureKind::Storage));
    assert_eq!(outcome.state, JobState::RetryableFailure);
    assert_eq!(provider.calls(), 0);
}

// =============================================================================
// Success Path
// =============================================================================

#[tokio::test]
async fn test_success_stores_narrative() {
    let profile = master_profile();
    let db = create_db_with(&profile).await;
    let provider = ScriptedProvider::hosted().then_ok("Seven rivers meet in you.").arc();

    let job = EnrichmentJob::new(db.clone(), db.clone(), provider.clone());
    let outcome = job.run(&profile.id, &CancellationToken::new()).await;

    assert!(outcome.is_success(), "{outcome}");
    assert_eq!(outcome.tier, Some(Tier::Master));
    assert_eq!(outcome.attempts, 1);
    assert!(outcome.summary.contains("master"));

    let stored = db.get(&profile.id).await.unwrap().unwrap();
    assert_eq!(stored.enrichment.unwrap().narrative, "Seven rivers meet in you.");
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn test_prompt_reflects_profile_data() {
    let profile = detailed_profile();
    let db = create_db_with(&profile).await;
    let provider = ScriptedProvider::local().arc();

    let job = EnrichmentJob::new(db.clone(), db.clone(), provider.clone());
    job.run(&profile.id, &CancellationToken::new()).await;

    let prompt = provider.last_prompt().expect("prompt sent");
    assert!(prompt.contains("- **Full Name:** Maria Helena Costa"));
    assert!(prompt.contains("detailed depth"));
    assert!(!prompt.contains("**Hospital:**"));
}

#[tokio::test]
async fn test_rerun_replaces_with_newer_result() {
    let profile = detailed_profile();
    let db = create_db_with(&profile).await;
    let provider = ScriptedProvider::hosted().then_ok("first").then_ok("second").arc();
    let job = EnrichmentJob::new(db.clone(), db.clone(), provider.clone());

    assert!(job.run(&profile.id, &CancellationToken::new()).await.is_success());
    let first = db.get(&profile.id).await.unwrap().unwrap().enrichment.unwrap();
    assert!(job.run(&profile.id, &CancellationToken::new()).await.is_success());
    let second = db.get(&profile.id).await.unwrap().unwrap().enrichment.unwrap();

    assert_eq!(second.narrative, "second");
    assert!(second.generated_at > first.generated_at);
}

#[tokio::test]
async fn test_edit_during_generation_is_preserved() {
    let profile = detailed_profile();
    let db = create_db_with(&profile).await;
    let provider = ScriptedProvider::hosted()
        .with_delay(Duration::from_millis(200))
        .arc();
    let job = EnrichmentJob::new(db.clone(), db.clone(), provider.clone());
    let cancel = CancellationToken::new();

    let mut edited = profile.clone();
    edited.edit(|f| f.nickname = Some("Edited".to_string()));

    let (outcome, _) = tokio::join!(job.run(&profile.id, &cancel), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        db.save(&edited).await.unwrap();
    });

    assert!(outcome.is_success(), "{outcome}");
    let stored = db.get(&profile.id).await.unwrap().unwrap();
    assert_eq!(stored.fields.nickname.as_deref(), Some("Edited"));
    assert!(stored.enrichment.is_some());
}

#[tokio::test]
async fn test_newer_enrichment_wins_over_late_result() {
    let profile = detailed_profile();
    let db = create_db_with(&profile).await;
    let provider = ScriptedProvider::hosted()
        .with_delay(Duration::from_millis(200))
        .then_ok("late result")
        .arc();
    let job = EnrichmentJob::new(db.clone(), db.clone(), provider.clone());
    let cancel = CancellationToken::new();
    let newer = EnrichmentResult::at("other writer", Utc::now() + ChronoDuration::hours(1));

    let (outcome, _) = tokio::join!(job.run(&profile.id, &cancel), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(db.store_enrichment(&profile.id, &newer).await.unwrap());
    });

    assert!(outcome.is_success(), "{outcome}");
    assert!(outcome.superseded);
    assert!(outcome.summary.contains("newer enrichment is already stored"));
    assert!(!outcome.summary.starts_with("Generated"));

    let stored = db.get(&profile.id).await.unwrap().unwrap();
    assert_eq!(stored.enrichment.unwrap().narrative, "other writer");
}

// =============================================================================
// Failures
// =============================================================================

#[tokio::test]
async fn test_provider_failures_are_classified() {
    let cases = [
        (GenerationError::Unauthorized, JobState::PermanentFailure, true),
        (GenerationError::InvalidResponse("empty".into()), JobState::PermanentFailure, true),
        (GenerationError::NoProviderAvailable, JobState::PermanentFailure, true),
        (GenerationError::Timeout, JobState::RetryableFailure, false),
        (GenerationError::Unreachable("localhost:11434".into()), JobState::RetryableFailure, false),
    ];

    for (error, state, attention) in cases {
        let profile = detailed_profile();
        let db = create_db_with(&profile).await;
        let provider = ScriptedProvider::hosted().then_err(error.clone()).arc();
        let job = EnrichmentJob::new(db.clone(), db.clone(), provider);

        let outcome = job.run(&profile.id, &CancellationToken::new()).await;
        assert_eq!(outcome.state, state, "{error:?}");
        assert_eq!(outcome.needs_attention, attention, "{error:?}");
        assert!(db.get(&profile.id).await.unwrap().unwrap().enrichment.is_none());
    }
}

#[tokio::test]
async fn test_rate_limit_passes_retry_after() {
    let profile = detailed_profile();
    let db = create_db_with(&profile).await;
    let provider = ScriptedProvider::hosted()
        .then_err(GenerationError::RateLimited { retry_after_secs: Some(12) })
        .arc();
    let job = EnrichmentJob::new(db.clone(), db.clone(), provider);

    let outcome = job.run(&profile.id, &CancellationToken::new()).await;
    assert_eq!(outcome.failure, Some(FailureKind::RateLimited));
    assert_eq!(outcome.retry_after, Some(Duration::from_secs(12)));
}

#[tokio::test]
async fn test_failure_summary_has_no_response_body() {
    let profile = detailed_profile();
    let db = create_db_with(&profile).await;
    let provider = ScriptedProvider::hosted()
        .then_err(GenerationError::InvalidResponse("secret body text".into()))
        .arc();
    let job = EnrichmentJob::new(db.clone(), db.clone(), provider);

    let outcome = job.run(&profile.id, &CancellationToken::new()).await;
    assert!(!outcome.summary.contains("secret body text"));
    assert!(!outcome.to_string().contains("secret body text"));
}

// =============================================================================
// Cancellation and Deletion
// =============================================================================

#[tokio::test]
async fn test_cancel_before_start() {
    let profile = detailed_profile();
    let db = create_db_with(&profile).await;
    let provider = ScriptedProvider::hosted().arc();
    let job = EnrichmentJob::new(db.clone(), db.clone(), provider.clone());

    let cancel = CancellationToken::new();
    cancel.cancel();
    let outcome = job.run(&profile.id, &cancel).await;

    assert_eq!(outcome.failure, Some(FailureKind::Cancelled));
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn test_cancel_during_consent_read_skips_profile_load() {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    let mut consent = MockConsentStore::new();
    consent.expect_get_status().returning(move |_| {
        trigger.cancel();
        Ok(ConsentStatus::Granted)
    });
    let mut profiles = MockProfileStore::new();
    profiles
        .expect_get()
        .returning(|_| Err(StorageError::corrupt("unexpected read")));
    profiles.expect_store_enrichment().never();
    let provider = ScriptedProvider::hosted().arc();

    let job = EnrichmentJob::new(Arc::new(profiles), Arc::new(consent), provider.clone());
    let outcome = job.run("p-1", &cancel).await;

    assert_eq!(outcome.failure, Some(FailureKind::Cancelled));
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn test_cancel_during_generation_writes_nothing() {
    let profile = detailed_profile();
    let db = create_db_with(&profile).await;
    let provider = ScriptedProvider::hosted()
        .with_delay(Duration::from_secs(5))
        .arc();
    let job = EnrichmentJob::new(db.clone(), db.clone(), provider.clone());
    let cancel = CancellationToken::new();

    let (outcome, _) = tokio::join!(job.run(&profile.id, &cancel), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();
    });

    assert_eq!(outcome.failure, Some(FailureKind::Cancelled));
    assert_eq!(provider.calls(), 1);
    assert!(db.get(&profile.id).await.unwrap().unwrap().enrichment.is_none());
}

#[tokio::test]
async fn test_profile_deleted_during_generation() {
    let profile = detailed_profile();
    let db = create_db_with(&profile).await;
    let provider = ScriptedProvider::hosted()
        .with_delay(Duration::from_millis(200))
        .arc();
    let job = EnrichmentJob::new(db.clone(), db.clone(), provider);
    let cancel = CancellationToken::new();

    let (outcome, _) = tokio::join!(job.run(&profile.id, &cancel), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(db.delete(&profile.id).await.unwrap());
    });

    assert_eq!(outcome.failure, Some(FailureKind::ProfileNotFound));
    assert_eq!(db.count().await.unwrap(), 0);
}

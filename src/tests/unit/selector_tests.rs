//! Provider Selector Unit Tests
//!
//! Mode routing for the combined provider: forced modes skip probing,
//! ordered modes fall through to the first available backend.

use std::sync::Arc;

use async_trait::async_trait;
use mockall::predicate::always;
use rstest::rstest;

use crate::core::llm::provider::MockTextProvider;
use crate::core::llm::{
    AutoPrimary, CombinedProvider, GenerationError, ProviderKind, ProviderMode, ProviderSettings, TextProvider,
};
use crate::core::profile::EnrichmentResult;
use crate::database::StorageError;
use crate::tests::common::{detailed_profile, ScriptedProvider};
use crate::tests::unit::request_for;

fn mock(id: &'static str, available: Option<bool>) -> MockTextProvider {
    let mut provider = MockTextProvider::new();
    provider.expect_id().return_const(id);
    provider.expect_kind().return_const(match id {
        "hosted" => ProviderKind::Hosted,
        _ => ProviderKind::Local,
    });
    match available {
        Some(available) => {
            provider.expect_is_available().return_const(available);
        }
        None => {
            provider.expect_is_available().never();
        }
    }
    provider
}

fn combined(hosted: MockTextProvider, local: MockTextProvider, mode: ProviderMode) -> CombinedProvider {
    CombinedProvider::new(Arc::new(hosted), Arc::new(local), Arc::new(mode))
}

struct BrokenSettings;

#[async_trait]
impl ProviderSettings for BrokenSettings {
    async fn provider_mode(&self) -> Result<ProviderMode, StorageError> {
        Err(StorageError::corrupt("settings unreadable"))
    }

    async fn set_provider_mode(&self, _mode: ProviderMode) -> Result<(), StorageError> {
        Err(StorageError::corrupt("settings unreadable"))
    }
}

// =============================================================================
// Routing
// =============================================================================

#[tokio::test]
async fn test_remote_only_never_probes() {
    let provider = combined(mock("hosted", None), mock("local", None), ProviderMode::RemoteOnly);
    assert_eq!(provider.select().await.unwrap().id(), "hosted");
}

#[tokio::test]
async fn test_local_only_never_probes() {
    let provider = combined(mock("hosted", None), mock("local", None), ProviderMode::LocalOnly);
    assert_eq!(provider.select().await.unwrap().id(), "local");
}

#[rstest]
#[case::prefer_remote_both(ProviderMode::PreferRemote, true, true, "hosted")]
#[case::prefer_remote_fallback(ProviderMode::PreferRemote, false, true, "local")]
#[case::prefer_local_both(ProviderMode::PreferLocal, true, true, "local")]
#[case::prefer_local_fallback(ProviderMode::PreferLocal, true, false, "hosted")]
#[case::auto_both(ProviderMode::Auto, true, true, "hosted")]
#[case::auto_fallback(ProviderMode::Auto, false, true, "local")]
#[tokio::test]
async fn test_ordered_modes(
    #[case] mode: ProviderMode,
    #[case] hosted_up: bool,
    #[case] local_up: bool,
    #[case] expected: &str,
) {
    let hosted = ScriptedProvider::hosted();
    let hosted = if hosted_up { hosted } else { hosted.unavailable() };
    let local = ScriptedProvider::local();
    let local = if local_up { local } else { local.unavailable() };

    let provider = CombinedProvider::new(hosted.arc(), local.arc(), Arc::new(mode));
    assert_eq!(provider.select().await.unwrap().id(), expected);
}

#[tokio::test]
async fn test_ordered_mode_with_nothing_available() {
    let provider = combined(
        mock("hosted", Some(false)),
        mock("local", Some(false)),
        ProviderMode::PreferRemote,
    );
    assert_eq!(provider.select().await.err(), Some(GenerationError::NoProviderAvailable));
    assert!(!provider.is_available().await);
}

#[tokio::test]
async fn test_auto_with_local_primary() {
    // Local is probed first and answers, so hosted is never asked
    let provider = combined(mock("hosted", None), mock("local", Some(true)), ProviderMode::Auto)
        .with_auto_primary(AutoPrimary::Local);
    assert_eq!(provider.select().await.unwrap().id(), "local");
}

#[tokio::test]
async fn test_unreadable_settings_fall_back_to_default() {
    let provider = CombinedProvider::new(
        Arc::new(mock("hosted", None)),
        Arc::new(mock("local", None)),
        Arc::new(BrokenSettings),
    )
    .with_default_mode(ProviderMode::LocalOnly);

    assert_eq!(provider.current_mode().await, ProviderMode::LocalOnly);
    assert_eq!(provider.select().await.unwrap().id(), "local");
}

// =============================================================================
// Generation
// =============================================================================

#[tokio::test]
async fn test_generation_goes_to_selected_backend() {
    let hosted = mock("hosted", Some(false));
    let mut local = mock("local", Some(true));
    local
        .expect_generate_enrichment()
        .with(always())
        .times(1)
        .returning(|_| Ok(EnrichmentResult::new("from local")));

    let provider = combined(hosted, local, ProviderMode::PreferRemote);
    let result = provider.generate_enrichment(&request_for(&detailed_profile())).await.unwrap();
    assert_eq!(result.narrative, "from local");
    assert_eq!(provider.id(), "combined");
    assert_eq!(provider.kind(), ProviderKind::Combined);
}

#[tokio::test]
async fn test_forced_backend_error_is_not_rerouted() {
    let hosted = ScriptedProvider::hosted().then_err(GenerationError::Unauthorized).arc();
    let local = ScriptedProvider::local().arc();

    let provider = CombinedProvider::new(hosted.clone(), local.clone(), Arc::new(ProviderMode::RemoteOnly));
    let err = provider.generate_enrichment(&request_for(&detailed_profile())).await.unwrap_err();

    assert_eq!(err, GenerationError::Unauthorized);
    assert_eq!(hosted.calls(), 1);
    assert_eq!(local.calls(), 0);
}

#[tokio::test]
async fn test_mode_is_read_on_every_call() {
    let db = Arc::new(crate::database::Database::in_memory().await.unwrap());
    let hosted = ScriptedProvider::hosted().arc();
    let local = ScriptedProvider::local().arc();
    let provider = CombinedProvider::new(hosted.clone(), local.clone(), db.clone());
    let request = request_for(&detailed_profile());

    db.set_provider_mode(ProviderMode::LocalOnly).await.unwrap();
    provider.generate_enrichment(&request).await.unwrap();
    db.set_provider_mode(ProviderMode::RemoteOnly).await.unwrap();
    provider.generate_enrichment(&request).await.unwrap();

    assert_eq!(local.calls(), 1);
    assert_eq!(hosted.calls(), 1);
}

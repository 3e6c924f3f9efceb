//! Hosted Provider Unit Tests
//!
//! Tests for the OpenAI-compatible hosted backend including:
//! - Credential handling
//! - Request formatting
//! - Response parsing
//! - Status code mapping

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::config::HostedConfig;
use crate::core::credentials::{MemorySecretStore, SecretStore};
use crate::core::llm::{GenerationError, HostedProvider, ProviderKind, TextProvider};
use crate::tests::common::minimal_profile;
use crate::tests::unit::request_for;

const KEY_NAME: &str = "hosted_api_key";

fn config_for(server: &MockServer) -> HostedConfig {
    HostedConfig {
        base_url: server.uri(),
        model: "test-model".to_string(),
        timeout_secs: 5,
        ..HostedConfig::default()
    }
}

fn provider_with_key(server: &MockServer, key: Option<&str>) -> HostedProvider {
    let secrets: Arc<dyn SecretStore> = match key {
        Some(key) => Arc::new(MemorySecretStore::with_secret(KEY_NAME, key)),
        None => Arc::new(MemorySecretStore::new()),
    };
    HostedProvider::new(config_for(server), secrets).expect("client")
}

fn completion_body(content: &str) -> serde_json::Value {
    json!({
        "id": "cmpl-1",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }]
    })
}

// =============================================================================
// Identity and Availability
// =============================================================================

#[tokio::test]
async fn test_provider_identity() {
    let server = MockServer::start().await;
    let provider = provider_with_key(&server, Some("sk-test-123456"));
    assert_eq!(provider.id(), "hosted");
    assert_eq!(provider.kind(), ProviderKind::Hosted);
    assert_eq!(provider.model(), "test-model");
}

#[tokio::test]
async fn test_available_only_with_key() {
    let server = MockServer::start().await;
    assert!(provider_with_key(&server, Some("sk-test-123456")).is_available().await);
    assert!(!provider_with_key(&server, None).is_available().await);
    assert!(!provider_with_key(&server, Some("   ")).is_available().await);
}

#[tokio::test]
async fn test_key_is_read_per_call() {
    let server = MockServer::start().await;
    let secrets = Arc::new(MemorySecretStore::new());
    let provider = HostedProvider::new(config_for(&server), secrets.clone()).expect("client");

    assert!(!provider.is_available().await);
    secrets.store_secret(KEY_NAME, "sk-late-key-0001").unwrap();
    assert!(provider.is_available().await);
}

// =============================================================================
// Request and Response
// =============================================================================

#[tokio::test]
async fn test_missing_key_sends_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("unused")))
        .expect(0)
        .mount(&server)
        .await;

    let provider = provider_with_key(&server, None);
    let err = provider
        .generate_enrichment(&request_for(&minimal_profile()))
        .await
        .unwrap_err();
    assert_eq!(err, GenerationError::Unauthorized);
}

#[tokio::test]
async fn test_successful_generation() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("Authorization", "Bearer sk-test-123456"))
        .and(body_partial_json(json!({ "model": "test-model", "max_tokens": 420 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("  A luminous narrative.  ")))
        .expect(1)
        .mount(&server)
        .await;

    let provider = provider_with_key(&server, Some("sk-test-123456"));
    let result = provider
        .generate_enrichment(&request_for(&minimal_profile()))
        .await
        .expect("generation succeeds");

    assert_eq!(result.narrative, "A luminous narrative.");
}

#[tokio::test]
async fn test_blank_content_is_invalid() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("   ")))
        .mount(&server)
        .await;

    let provider = provider_with_key(&server, Some("sk-test-123456"));
    let err = provider
        .generate_enrichment(&request_for(&minimal_profile()))
        .await
        .unwrap_err();
    assert!(matches!(err, GenerationError::InvalidResponse(_)));
}

#[tokio::test]
async fn test_missing_choices_is_invalid() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
        .mount(&server)
        .await;

    let provider = provider_with_key(&server, Some("sk-test-123456"));
    let err = provider
        .generate_enrichment(&request_for(&minimal_profile()))
        .await
        .unwrap_err();
    assert!(matches!(err, GenerationError::InvalidResponse(_)));
}

// =============================================================================
// Error Mapping
// =============================================================================

#[tokio::test]
async fn test_unauthorized_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_string("{\"error\":\"bad key\"}"))
        .mount(&server)
        .await;

    let provider = provider_with_key(&server, Some("sk-revoked-0001"));
    let err = provider
        .generate_enrichment(&request_for(&minimal_profile()))
        .await
        .unwrap_err();
    assert_eq!(err, GenerationError::Unauthorized);
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_rate_limited_carries_retry_after() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "7"))
        .mount(&server)
        .await;

    let provider = provider_with_key(&server, Some("sk-test-123456"));
    let err = provider
        .generate_enrichment(&request_for(&minimal_profile()))
        .await
        .unwrap_err();
    assert_eq!(err, GenerationError::RateLimited { retry_after_secs: Some(7) });
    assert_eq!(err.retry_after(), Some(Duration::from_secs(7)));
}

#[tokio::test]
async fn test_server_error_is_retryable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let provider = provider_with_key(&server, Some("sk-test-123456"));
    let err = provider
        .generate_enrichment(&request_for(&minimal_profile()))
        .await
        .unwrap_err();
    assert!(matches!(err, GenerationError::Unreachable(_)));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_slow_response_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(completion_body("late"))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let config = HostedConfig {
        timeout_secs: 1,
        ..config_for(&server)
    };
    let secrets = Arc::new(MemorySecretStore::with_secret(KEY_NAME, "sk-test-123456"));
    let provider = HostedProvider::new(config, secrets).expect("client");

    let err = provider
        .generate_enrichment(&request_for(&minimal_profile()))
        .await
        .unwrap_err();
    assert_eq!(err, GenerationError::Timeout);
}

//! Local Provider Unit Tests
//!
//! Tests for the Ollama-style local backend: tag probe, generate request
//! formatting and response parsing.

use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::config::LocalConfig;
use crate::core::llm::{GenerationError, LocalProvider, ProviderKind, TextProvider};
use crate::tests::common::master_profile;
use crate::tests::unit::request_for;

fn provider_for(host: String) -> LocalProvider {
    LocalProvider::new(LocalConfig {
        host,
        model: "llama3".to_string(),
        timeout_secs: 5,
        probe_timeout_ms: 500,
        ..LocalConfig::default()
    })
    .expect("client")
}

#[test]
fn test_provider_identity() {
    let provider = provider_for("http://localhost:11434".to_string());
    assert_eq!(provider.id(), "local");
    assert_eq!(provider.kind(), ProviderKind::Local);
    assert_eq!(provider.model(), "llama3");
}

#[tokio::test]
async fn test_available_when_tags_respond() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "models": [] })))
        .mount(&server)
        .await;

    assert!(provider_for(server.uri()).is_available().await);
}

#[tokio::test]
async fn test_unavailable_on_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    assert!(!provider_for(server.uri()).is_available().await);
}

#[tokio::test]
async fn test_unavailable_when_nothing_listens() {
    // Port 9 (discard) is not expected to run an HTTP server
    assert!(!provider_for("http://127.0.0.1:9".to_string()).is_available().await);
}

#[tokio::test]
async fn test_generate_non_streaming() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_partial_json(json!({
            "model": "llama3",
            "stream": false,
            "options": { "num_predict": 3780 }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "llama3",
            "response": "The river remembers.\n",
            "done": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    let result = provider_for(server.uri())
        .generate_enrichment(&request_for(&master_profile()))
        .await
        .expect("generation succeeds");
    assert_eq!(result.narrative, "The river remembers.");
}

#[tokio::test]
async fn test_empty_response_is_invalid() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "response": "", "done": true })))
        .mount(&server)
        .await;

    let err = provider_for(server.uri())
        .generate_enrichment(&request_for(&master_profile()))
        .await
        .unwrap_err();
    assert!(matches!(err, GenerationError::InvalidResponse(_)));
}

#[tokio::test]
async fn test_connection_refused_is_unreachable() {
    let err = provider_for("http://127.0.0.1:9".to_string())
        .generate_enrichment(&request_for(&master_profile()))
        .await
        .unwrap_err();
    assert!(err.is_retryable(), "unexpected error: {err:?}");
}

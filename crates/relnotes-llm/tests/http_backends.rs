//! HTTP-level tests for the Ollama and Gemini providers against a mock server.

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use relnotes_llm::retry::{with_retries, RetryPolicy};
use relnotes_llm::{BackendError, GeminiBackend, LlmBackend, OllamaBackend};

#[tokio::test]
async fn ollama_generate_round_trip() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_partial_json(json!({
            "model": "mistral",
            "stream": false,
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "mistral",
            "response": "a fine summary",
            "done": true,
        })))
        .expect(1)
        .mount(&server)
        .await;

    let backend = OllamaBackend::new(format!("{}/api/generate", server.uri()), "mistral");
    let out = backend.generate("summarize this").await.unwrap();
    assert_eq!(out, "a fine summary");
    assert!(backend.pacing().is_none());
}

#[tokio::test]
async fn ollama_surfaces_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(500).set_body_string("model not loaded"))
        .mount(&server)
        .await;

    let backend = OllamaBackend::new(format!("{}/api/generate", server.uri()), "mistral");
    match backend.generate("x").await {
        Err(BackendError::Status { status: 500, body }) => {
            assert!(body.contains("model not loaded"));
        }
        other => panic!("expected Status error, got {:?}", other.map(|_| ())),
    }
}

#[tokio::test]
async fn ollama_rejects_malformed_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let backend = OllamaBackend::new(format!("{}/api/generate", server.uri()), "mistral");
    assert!(matches!(
        backend.generate("x").await,
        Err(BackendError::MalformedResponse(_))
    ));
}

#[tokio::test]
async fn gemini_generate_round_trip() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-1.5-flash:generateContent"))
        .and(header("x-goog-api-key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{
                "content": {
                    "parts": [{"text": "part one "}, {"text": "part two"}],
                    "role": "model",
                },
                "finishReason": "STOP",
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let backend = GeminiBackend::new("test-key", "gemini-1.5-flash")
        .with_base_url(server.uri())
        .with_pacing(Duration::ZERO);
    let out = backend.generate("summarize this").await.unwrap();
    assert_eq!(out, "part one part two");
    assert!(backend.pacing().is_none());
}

#[tokio::test]
async fn gemini_empty_candidates_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-1.5-flash:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"candidates": []})))
        .mount(&server)
        .await;

    let backend = GeminiBackend::new("test-key", "gemini-1.5-flash").with_base_url(server.uri());
    assert!(matches!(
        backend.generate("x").await,
        Err(BackendError::MalformedResponse(_))
    ));
}

#[tokio::test]
async fn gemini_default_pacing_is_set() {
    let backend = GeminiBackend::new("k", "gemini-1.5-flash");
    assert_eq!(backend.pacing(), Some(Duration::from_secs(2)));
}

#[tokio::test]
async fn retry_recovers_from_transient_server_errors() {
    let server = MockServer::start().await;
    // First two requests hit the transient-failure mock, then it stops
    // matching and the success mock takes over.
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"response": "recovered"})))
        .mount(&server)
        .await;

    let backend = OllamaBackend::new(format!("{}/api/generate", server.uri()), "mistral");
    let out = with_retries(&RetryPolicy::no_delays(3), || backend.generate("x"))
        .await
        .unwrap();
    assert_eq!(out, "recovered");
}

//! Mock HTTP server tests for `OpenAiCompatProvider::complete()`.
//!
//! Uses [`wiremock`] to stand up a local HTTP server that emulates
//! OpenAI-compatible chat completion responses, so the full request and
//! response path runs without a real API.

use std::collections::HashMap;

use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use lexrag_llm::config::LlmProviderConfig;
use lexrag_llm::error::ProviderError;
use lexrag_llm::openai_compat::OpenAiCompatProvider;
use lexrag_llm::provider::Provider;
use lexrag_llm::types::{ChatMessage, ChatRequest};

fn mock_config(server_url: &str) -> LlmProviderConfig {
    LlmProviderConfig {
        name: "mock-provider".into(),
        base_url: server_url.into(),
        api_key_env: "MOCK_UNUSED_KEY".into(),
        headers: HashMap::new(),
        timeout_secs: Some(5),
    }
}

fn test_request() -> ChatRequest {
    ChatRequest::new("test-model", vec![ChatMessage::user("Is theft a crime?")])
}

fn provider_for(server: &MockServer) -> OpenAiCompatProvider {
    OpenAiCompatProvider::with_api_key(mock_config(&server.uri()), "sk-mock-key".into())
}

// ── Successful completion ──────────────────────────────────────────────

#[tokio::test]
async fn complete_success_text_response() {
    let server = MockServer::start().await;

    let body = serde_json::json!({
        "id": "chatcmpl-test-001",
        "object": "chat.completion",
        "model": "test-model",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": "criminal_law"},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 10, "completion_tokens": 3, "total_tokens": 13}
    });

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("Authorization", "Bearer sk-mock-key"))
        .and(header("Content-Type", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .expect(1)
        .mount(&server)
        .await;

    let response = provider_for(&server)
        .complete(&test_request())
        .await
        .expect("completion should succeed");

    assert_eq!(response.id, "chatcmpl-test-001");
    assert_eq!(response.model, "test-model");
    assert_eq!(response.first_text(), Some("criminal_law"));
    assert_eq!(response.usage.map(|u| u.total_tokens), Some(13));
}

#[tokio::test]
async fn complete_empty_choices() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"id": "e", "model": "m", "choices": []})),
        )
        .mount(&server)
        .await;

    let response = provider_for(&server).complete(&test_request()).await.unwrap();
    assert!(response.first_text().is_none());
}

#[tokio::test]
async fn request_options_are_forwarded() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(serde_json::json!({
            "model": "test-model",
            "temperature": 0.1,
            "max_tokens": 256
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "opts",
            "model": "test-model",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "ok"}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let request = test_request().with_temperature(0.1).with_max_tokens(256);
    let response = provider_for(&server).complete(&request).await.unwrap();
    assert_eq!(response.first_text(), Some("ok"));
}

#[tokio::test]
async fn custom_headers_are_sent() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("X-Org", "lexrag-tests"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "h",
            "model": "m",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "hi"}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = mock_config(&server.uri());
    config
        .headers
        .insert("X-Org".into(), "lexrag-tests".into());
    let provider = OpenAiCompatProvider::with_api_key(config, "sk-mock-key".into());

    let response = provider.complete(&test_request()).await.unwrap();
    assert_eq!(response.first_text(), Some("hi"));
}

// ── Error mapping ──────────────────────────────────────────────────────

#[tokio::test]
async fn complete_401_maps_to_auth_failed() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
        .mount(&server)
        .await;

    let err = provider_for(&server)
        .complete(&test_request())
        .await
        .unwrap_err();
    match err {
        ProviderError::AuthFailed(msg) => assert!(msg.contains("invalid api key")),
        other => panic!("expected AuthFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn complete_429_uses_body_retry_after() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(429)
                .set_body_json(serde_json::json!({"retry_after_ms": 1500})),
        )
        .mount(&server)
        .await;

    let err = provider_for(&server)
        .complete(&test_request())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ProviderError::RateLimited {
            retry_after_ms: 1500
        }
    ));
}

#[tokio::test]
async fn complete_429_prefers_retry_after_header() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("retry-after", "2")
                .set_body_json(serde_json::json!({"retry_after_ms": 1500})),
        )
        .mount(&server)
        .await;

    let err = provider_for(&server)
        .complete(&test_request())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ProviderError::RateLimited {
            retry_after_ms: 2000
        }
    ));
}

#[tokio::test]
async fn complete_404_maps_to_model_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(404).set_body_string("no such model"))
        .mount(&server)
        .await;

    let err = provider_for(&server)
        .complete(&test_request())
        .await
        .unwrap_err();
    match err {
        ProviderError::ModelNotFound(msg) => assert!(msg.contains("test-model")),
        other => panic!("expected ModelNotFound, got {other:?}"),
    }
}

#[tokio::test]
async fn complete_500_maps_to_status_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .mount(&server)
        .await;

    let err = provider_for(&server)
        .complete(&test_request())
        .await
        .unwrap_err();
    match err {
        ProviderError::Status { status, body } => {
            assert_eq!(status, 500);
            assert!(body.contains("upstream exploded"));
        }
        other => panic!("expected Status, got {other:?}"),
    }
}

#[tokio::test]
async fn complete_malformed_json_maps_to_invalid_response() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{not json"))
        .mount(&server)
        .await;

    let err = provider_for(&server)
        .complete(&test_request())
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::InvalidResponse(_)));
}

#[tokio::test]
async fn missing_api_key_fails_before_sending() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut config = mock_config(&server.uri());
    config.api_key_env = "LEXRAG_MOCK_KEY_THAT_IS_NEVER_SET".into();
    let provider = OpenAiCompatProvider::new(config);

    let err = provider.complete(&test_request()).await.unwrap_err();
    assert!(matches!(err, ProviderError::NotConfigured(_)));
}

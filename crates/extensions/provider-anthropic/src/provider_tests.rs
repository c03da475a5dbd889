use super::*;
use wiremock::{matchers, Mock, MockServer, ResponseTemplate};

fn request() -> CompletionRequest {
    CompletionRequest::new("claude-3-5-haiku-latest", "Decide clarity.", "Command: click login")
        .with_max_tokens(500)
        .with_temperature(0.3)
}

#[test]
fn test_provider_id() {
    assert_eq!(AnthropicProvider::new().id(), "anthropic");
}

#[test]
fn test_default_url() {
    assert_eq!(AnthropicProvider::default().api_url, DEFAULT_API_URL);
}

#[test]
fn test_build_request() {
    let provider = AnthropicProvider::new();
    let api_request = provider.build_request(&request());
    assert_eq!(api_request.model, "claude-3-5-haiku-latest");
    assert_eq!(api_request.max_tokens, 500);
    assert_eq!(api_request.system, "Decide clarity.");
    assert_eq!(api_request.messages.len(), 1);
    assert_eq!(api_request.messages[0].role, "user");
    assert_eq!(api_request.messages[0].content, "Command: click login");
}

#[tokio::test]
async fn test_complete_success() {
    let mock_server = MockServer::start().await;

    let response_body = serde_json::json!({
        "id": "msg_01",
        "type": "message",
        "role": "assistant",
        "model": "claude-3-5-haiku-latest",
        "content": [{"type": "text", "text": "{\"clear\": true}"}],
        "stop_reason": "end_turn",
        "usage": {"input_tokens": 40, "output_tokens": 6}
    });

    Mock::given(matchers::method("POST"))
        .and(matchers::path("/"))
        .and(matchers::header("x-api-key", "sk-test"))
        .and(matchers::header("anthropic-version", API_VERSION))
        .and(matchers::body_partial_json(serde_json::json!({
            "model": "claude-3-5-haiku-latest",
            "system": "Decide clarity.",
            "messages": [{"role": "user", "content": "Command: click login"}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(&response_body))
        .expect(1)
        .mount(&mock_server)
        .await;

    let provider = AnthropicProvider::with_url(mock_server.uri());
    let response = provider.complete("sk-test", request()).await.unwrap();

    assert_eq!(response.id, "msg_01");
    assert_eq!(response.text, "{\"clear\": true}");
    assert_eq!(response.usage.total(), 46);
}

#[tokio::test]
async fn test_missing_content_is_invalid_response() {
    let mock_server = MockServer::start().await;

    Mock::given(matchers::method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"id": "msg_02", "content": []})),
        )
        .mount(&mock_server)
        .await;

    let provider = AnthropicProvider::with_url(mock_server.uri());
    let err = provider.complete("sk-test", request()).await.unwrap_err();
    assert!(matches!(err, ProviderError::InvalidResponse(_)));
}

#[tokio::test]
async fn test_auth_error_uses_api_message() {
    let mock_server = MockServer::start().await;

    let error_body = r#"{"type": "error", "error": {"type": "authentication_error", "message": "invalid x-api-key"}}"#;
    Mock::given(matchers::method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_string(error_body))
        .mount(&mock_server)
        .await;

    let provider = AnthropicProvider::with_url(mock_server.uri());
    let err = provider.complete("bad-key", request()).await.unwrap_err();
    match err {
        ProviderError::AuthenticationFailed(message) => assert_eq!(message, "invalid x-api-key"),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_overloaded_is_retryable() {
    let mock_server = MockServer::start().await;

    Mock::given(matchers::method("POST"))
        .respond_with(ResponseTemplate::new(529).set_body_string("overloaded"))
        .mount(&mock_server)
        .await;

    let provider = AnthropicProvider::with_url(mock_server.uri());
    let err = provider.complete("sk-test", request()).await.unwrap_err();
    assert_eq!(err.status(), Some(529));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_rate_limited() {
    let mock_server = MockServer::start().await;

    Mock::given(matchers::method("POST"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&mock_server)
        .await;

    let provider = AnthropicProvider::with_url(mock_server.uri());
    let err = provider.complete("sk-test", request()).await.unwrap_err();
    assert!(matches!(err, ProviderError::RateLimited { .. }));
}

#[tokio::test]
async fn test_unreachable_endpoint_is_network_error() {
    let provider = AnthropicProvider::with_url("http://127.0.0.1:1/v1/messages".to_string());
    let err = provider.complete("sk-test", request()).await.unwrap_err();
    assert!(matches!(err, ProviderError::Network(_)));
}

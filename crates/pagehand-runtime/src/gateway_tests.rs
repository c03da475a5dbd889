use super::*;
use crate::test_support::ScriptedProvider;

fn gateway(provider: Arc<ScriptedProvider>, limiter: RateLimiter) -> ModelGateway {
    ModelGateway::new(Arc::new(limiter)).with_provider(ProviderKind::Claude, provider)
}

fn request() -> CompletionRequest {
    CompletionRequest::new("test-model", "system", "hello")
}

#[tokio::test]
async fn test_empty_api_key_is_configuration_error() {
    let provider = Arc::new(ScriptedProvider::new(vec!["ok"]));
    let gateway = gateway(provider.clone(), RateLimiter::default());

    let err = gateway.call(ProviderKind::Claude, "  ", request()).await.unwrap_err();
    assert!(matches!(err, PipelineError::Configuration(_)));
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn test_unregistered_provider() {
    let provider = Arc::new(ScriptedProvider::new(vec!["ok"]));
    let gateway = gateway(provider, RateLimiter::default());

    let err = gateway.call(ProviderKind::OpenAI, "key", request()).await.unwrap_err();
    assert!(matches!(err, PipelineError::Configuration(_)));
}

#[tokio::test]
async fn test_returns_text() {
    let provider = Arc::new(ScriptedProvider::new(vec!["{\"clear\": true}"]));
    let gateway = gateway(provider.clone(), RateLimiter::default());

    let text = gateway.call(ProviderKind::Claude, "key", request()).await.unwrap();
    assert_eq!(text, "{\"clear\": true}");
    assert_eq!(provider.calls(), 1);
    assert_eq!(provider.requests()[0].user_message, "hello");
}

#[tokio::test]
async fn test_model_config_request_limits() {
    let settings = Settings::default();
    let model = ModelConfig::intent(&settings);
    let req = model.request("sys", "msg");
    assert_eq!(req.model, settings.intent_model);
    assert_eq!(req.max_tokens, 500);
    let model = ModelConfig::codegen(&settings);
    assert_eq!(model.request("sys", "msg").model, settings.codegen_model);
}

#[tokio::test(start_paused = true)]
async fn test_rate_limited_after_capacity() {
    let provider = Arc::new(ScriptedProvider::new(vec!["a", "b", "c"]));
    let gateway = gateway(provider.clone(), RateLimiter::new(2, Duration::from_secs(60)));

    gateway.call(ProviderKind::Claude, "key", request()).await.unwrap();
    gateway.call(ProviderKind::Claude, "key", request()).await.unwrap();
    let err = gateway.call(ProviderKind::Claude, "key", request()).await.unwrap_err();
    assert!(matches!(err, PipelineError::RateLimited { wait } if wait == Duration::from_secs(60)));
    assert_eq!(provider.calls(), 2);
}

#[tokio::test]
async fn test_invalid_response_is_protocol_error() {
    let provider = Arc::new(ScriptedProvider::from_results(vec![Err(
        ProviderError::InvalidResponse("missing content".to_string()),
    )]));
    let gateway = gateway(provider, RateLimiter::default());

    let err = gateway.call(ProviderKind::Claude, "key", request()).await.unwrap_err();
    assert!(matches!(err, PipelineError::Protocol(_)));
}

#[tokio::test]
async fn test_api_error_is_provider_error() {
    let provider = Arc::new(ScriptedProvider::from_results(vec![Err(
        ProviderError::from_api_response(503, "overloaded".to_string()),
    )]));
    let gateway = gateway(provider, RateLimiter::default());

    let err = gateway.call(ProviderKind::Claude, "key", request()).await.unwrap_err();
    assert!(matches!(err, PipelineError::Provider(ProviderError::ApiError { status: 503, .. })));
    assert!(err.is_retryable());
}

#[tokio::test(start_paused = true)]
async fn test_timeout_is_retryable_provider_error() {
    let provider = Arc::new(ScriptedProvider::new(vec!["late"]).with_delay(Duration::from_secs(120)));
    let gateway = gateway(provider, RateLimiter::default()).with_timeout(Duration::from_secs(30));

    let err = gateway.call(ProviderKind::Claude, "key", request()).await.unwrap_err();
    assert!(matches!(err, PipelineError::Provider(ProviderError::Timeout(30))));
    assert!(err.is_retryable());
}

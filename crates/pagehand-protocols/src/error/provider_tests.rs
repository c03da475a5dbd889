use super::*;

#[test]
fn test_provider_error_api_error() {
    let err = ProviderError::ApiError {
        status: 500,
        message: "Internal Server Error".to_string(),
    };
    assert!(err.to_string().contains("500"));
    assert!(err.to_string().contains("Internal Server Error"));
}

#[test]
fn test_provider_error_rate_limited() {
    let err = ProviderError::RateLimited {
        retry_after_seconds: 60,
    };
    assert!(err.to_string().contains("Rate limited"));
    assert!(err.to_string().contains("60"));
}

#[test]
fn test_provider_error_timeout() {
    let err = ProviderError::Timeout(30);
    assert!(err.to_string().contains("Timeout"));
    assert!(err.to_string().contains("30"));
}

#[test]
fn test_from_api_response_auth_failed() {
    let err = ProviderError::from_api_response(401, "Invalid API key".to_string());
    assert!(matches!(err, ProviderError::AuthenticationFailed(_)));
}

#[test]
fn test_from_api_response_forbidden() {
    let err = ProviderError::from_api_response(403, "Forbidden".to_string());
    assert!(matches!(err, ProviderError::AuthenticationFailed(_)));
}

#[test]
fn test_from_api_response_rate_limited() {
    let err = ProviderError::from_api_response(429, "Rate limit exceeded".to_string());
    assert!(matches!(err, ProviderError::RateLimited { .. }));
}

#[test]
fn test_from_api_response_generic_error() {
    let err = ProviderError::from_api_response(500, "Internal Server Error".to_string());
    assert!(matches!(err, ProviderError::ApiError { status: 500, .. }));
}

#[test]
fn test_is_retryable() {
    assert!(ProviderError::RateLimited { retry_after_seconds: 5 }.is_retryable());
    assert!(ProviderError::Network("err".to_string()).is_retryable());
    assert!(ProviderError::Timeout(30).is_retryable());
    assert!(ProviderError::ApiError { status: 503, message: "busy".to_string() }.is_retryable());
    assert!(!ProviderError::AuthenticationFailed("err".to_string()).is_retryable());
    assert!(!ProviderError::ApiError { status: 400, message: "err".to_string() }.is_retryable());
    assert!(!ProviderError::InvalidResponse("no content".to_string()).is_retryable());
}

#[test]
fn test_status() {
    assert_eq!(
        ProviderError::ApiError { status: 418, message: String::new() }.status(),
        Some(418)
    );
    assert_eq!(ProviderError::Network("x".to_string()).status(), None);
}

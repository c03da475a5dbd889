//! Remote model provider errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("Rate limited: retry after {retry_after_seconds} seconds")]
    RateLimited { retry_after_seconds: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Timeout after {0} seconds")]
    Timeout(u64),
}

impl ProviderError {
    /// Classify a non-success HTTP response from a provider.
    pub fn from_api_response(status: u16, message: String) -> Self {
        match status {
            401 | 403 => ProviderError::AuthenticationFailed(message),
            429 => ProviderError::RateLimited {
                retry_after_seconds: 60,
            },
            _ => ProviderError::ApiError { status, message },
        }
    }

    /// Whether a later identical request may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderError::RateLimited { .. } => true,
            ProviderError::Network(_) => true,
            ProviderError::Timeout(_) => true,
            ProviderError::ApiError { status, .. } => matches!(status, 500 | 502 | 503 | 504 | 529),
            _ => false,
        }
    }

    /// HTTP status associated with this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            ProviderError::ApiError { status, .. } => Some(*status),
            ProviderError::RateLimited { .. } => Some(429),
            ProviderError::AuthenticationFailed(_) => Some(401),
            _ => None,
        }
    }
}

#[cfg(test)]
#[path = "provider_tests.rs"]
mod tests;

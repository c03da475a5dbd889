//! Pipeline error kinds.

use std::time::Duration;

use pagehand_protocols::{ProviderError, SurfaceError};
use thiserror::Error;

/// Failure of a pipeline stage.
///
/// Stages return these; only the orchestrator decides between retrying,
/// surfacing and giving up.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Missing or invalid configuration. Never retried.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The remote model call failed.
    #[error("Provider error: {0}")]
    Provider(ProviderError),

    /// The model response did not have the expected shape.
    #[error("Malformed model response: {0}")]
    Protocol(String),

    /// A blocking safety rule matched. Never retried.
    #[error("Blocked by safety rule '{reason}': {fragment}")]
    SafetyViolation { fragment: String, reason: String },

    #[error("Execution failed: {0}")]
    Execution(String),

    #[error("Verification failed: {0}")]
    Verification(String),

    /// Gateway capacity exhausted; back off for `wait`.
    #[error("Rate limited, retry in {wait:?}")]
    RateLimited { wait: Duration },
}

impl PipelineError {
    /// Whether another attempt may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            PipelineError::Configuration(_) | PipelineError::SafetyViolation { .. } => false,
            PipelineError::Provider(e) => e.is_retryable(),
            PipelineError::Protocol(_)
            | PipelineError::Execution(_)
            | PipelineError::Verification(_)
            | PipelineError::RateLimited { .. } => true,
        }
    }

    /// Message safe to show to the end user.
    pub fn user_message(&self) -> String {
        match self {
            PipelineError::Configuration(message) => message.clone(),
            PipelineError::Provider(ProviderError::AuthenticationFailed(_)) => {
                "The model provider rejected the API key. Please check your settings.".to_string()
            }
            PipelineError::Provider(ProviderError::RateLimited { retry_after_seconds }) => {
                format!(
                    "The model provider is rate limiting requests. Please try again in {} seconds.",
                    retry_after_seconds
                )
            }
            PipelineError::Provider(ProviderError::Timeout(_)) => {
                "The model provider did not respond in time. Please try again.".to_string()
            }
            PipelineError::Provider(ProviderError::InvalidRequest(_)) => {
                "The model provider rejected the request.".to_string()
            }
            PipelineError::Provider(e) => match e.status() {
                Some(status) => format!("The model provider returned an error (status {}).", status),
                None => "Could not reach the model provider.".to_string(),
            },
            PipelineError::Protocol(_) => {
                "The model returned a response I couldn't understand. Please try again.".to_string()
            }
            PipelineError::SafetyViolation { reason, .. } => format!("Action blocked: {}.", reason),
            PipelineError::Execution(message) => message.clone(),
            PipelineError::Verification(message) => {
                format!("The action ran but did not have the expected effect: {}", message)
            }
            PipelineError::RateLimited { wait } => format!(
                "Too many requests. Please wait {} seconds and try again.",
                wait.as_secs().max(1)
            ),
        }
    }
}

impl From<ProviderError> for PipelineError {
    fn from(error: ProviderError) -> Self {
        match error {
            ProviderError::InvalidResponse(detail) => PipelineError::Protocol(detail),
            other => PipelineError::Provider(other),
        }
    }
}

impl From<SurfaceError> for PipelineError {
    fn from(error: SurfaceError) -> Self {
        PipelineError::Execution(error.to_string())
    }
}

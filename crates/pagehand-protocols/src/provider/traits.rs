//! Model provider trait definition.

use async_trait::async_trait;

use super::{CompletionRequest, CompletionResponse};
use crate::error::ProviderError;

/// Core trait for remote model providers.
///
/// Implementations translate the provider-neutral request into their own
/// payload shape; nothing provider-specific crosses this boundary.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Returns the provider ID.
    fn id(&self) -> &str;

    /// Generate a completion with the given credentials.
    ///
    /// Fails with [`ProviderError::ApiError`] on a non-success status and
    /// [`ProviderError::InvalidResponse`] when the body lacks text content.
    async fn complete(
        &self,
        api_key: &str,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError>;
}

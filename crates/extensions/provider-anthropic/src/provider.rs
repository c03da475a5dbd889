//! Anthropic provider implementation.

use async_trait::async_trait;
use tracing::debug;

use pagehand_protocols::provider::{CompletionRequest, CompletionResponse, LLMProvider, Usage};
use pagehand_protocols::ProviderError;

use crate::api::{ApiErrorBody, ApiMessage, ApiRequest, ApiResponse};

const DEFAULT_API_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";

/// Anthropic Messages API provider.
///
/// The API key is supplied per call from the run's settings.
pub struct AnthropicProvider {
    api_url: String,
    client: reqwest::Client,
}

impl AnthropicProvider {
    pub fn new() -> Self {
        Self::with_url(DEFAULT_API_URL.to_string())
    }

    /// Create provider with a custom endpoint.
    pub fn with_url(api_url: String) -> Self {
        Self {
            api_url,
            client: reqwest::Client::new(),
        }
    }

    fn build_request(&self, request: &CompletionRequest) -> ApiRequest {
        ApiRequest {
            model: request.model.clone(),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            system: request.system.clone(),
            messages: vec![ApiMessage {
                role: "user".to_string(),
                content: request.user_message.clone(),
            }],
        }
    }

    async fn send_request(
        &self,
        api_key: &str,
        api_request: &ApiRequest,
    ) -> Result<reqwest::Response, ProviderError> {
        let response = self
            .client
            .post(&self.api_url)
            .header("x-api-key", api_key)
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json")
            .json(api_request)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&body)
                .map(|b| b.error.message)
                .unwrap_or(body);
            return Err(ProviderError::from_api_response(status, message));
        }

        Ok(response)
    }
}

impl Default for AnthropicProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LLMProvider for AnthropicProvider {
    fn id(&self) -> &str {
        "anthropic"
    }

    async fn complete(
        &self,
        api_key: &str,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        let api_request = self.build_request(&request);
        let response = self.send_request(api_key, &api_request).await?;
        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        let text = api_response
            .text()
            .ok_or_else(|| ProviderError::InvalidResponse("response has no text content".to_string()))?
            .to_string();
        debug!("Anthropic response {} ({} chars)", api_response.id, text.len());

        Ok(CompletionResponse {
            id: api_response.id,
            model: api_response.model,
            text,
            usage: Usage {
                input_tokens: api_response.usage.input_tokens,
                output_tokens: api_response.usage.output_tokens,
            },
        })
    }
}

#[cfg(test)]
#[path = "provider_tests.rs"]
mod tests;

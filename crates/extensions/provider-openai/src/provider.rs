//! OpenAI provider implementation.

use async_trait::async_trait;
use tracing::debug;

use pagehand_protocols::provider::{CompletionRequest, CompletionResponse, LLMProvider, Usage};
use pagehand_protocols::ProviderError;

use crate::api::{ApiErrorBody, ApiMessage, ApiRequest, ApiResponse};

const DEFAULT_API_URL: &str = "https://api.openai.com/v1/chat/completions";

/// OpenAI Chat Completions provider.
pub struct OpenAIProvider {
    api_url: String,
    client: reqwest::Client,
}

impl OpenAIProvider {
    pub fn new() -> Self {
        Self::with_url(DEFAULT_API_URL.to_string())
    }

    /// Create provider with custom API URL (for OpenAI-compatible APIs).
    pub fn with_url(api_url: String) -> Self {
        Self {
            api_url,
            client: reqwest::Client::new(),
        }
    }

    fn build_request(&self, request: &CompletionRequest) -> ApiRequest {
        let mut messages = Vec::with_capacity(2);
        if !request.system.is_empty() {
            messages.push(ApiMessage::new("system", &request.system));
        }
        messages.push(ApiMessage::new("user", &request.user_message));

        ApiRequest {
            model: request.model.clone(),
            messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
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
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(api_request)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&text)
                .map(|b| b.error.message)
                .unwrap_or(text);
            return Err(ProviderError::from_api_response(status, message));
        }

        Ok(response)
    }
}

impl Default for OpenAIProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LLMProvider for OpenAIProvider {
    fn id(&self) -> &str {
        "openai"
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
            .ok_or_else(|| ProviderError::InvalidResponse("response has no message content".to_string()))?
            .to_string();
        debug!("OpenAI response {} ({} chars)", api_response.id, text.len());

        let usage = api_response
            .usage
            .map(|u| Usage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
            })
            .unwrap_or_default();

        Ok(CompletionResponse {
            id: api_response.id,
            model: api_response.model,
            text,
            usage,
        })
    }
}

#[cfg(test)]
#[path = "provider_tests.rs"]
mod tests;

//! Provider-agnostic model gateway.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use pagehand_protocols::{CompletionRequest, LLMProvider, ProviderError, ProviderKind, Settings};
use tracing::debug;

use crate::error::PipelineError;
use crate::rate_limiter::RateLimiter;

/// Default per-call timeout.
pub const DEFAULT_MODEL_TIMEOUT: Duration = Duration::from_secs(30);

/// Which provider, key and model a stage calls with.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub provider: ProviderKind,
    pub api_key: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl ModelConfig {
    /// Intent resolution: small, near-deterministic answers.
    pub fn intent(settings: &Settings) -> Self {
        Self {
            provider: settings.provider,
            api_key: settings.api_key.clone(),
            model: settings.intent_model.clone(),
            max_tokens: 500,
            temperature: 0.3,
        }
    }

    /// Action generation.
    pub fn codegen(settings: &Settings) -> Self {
        Self {
            provider: settings.provider,
            api_key: settings.api_key.clone(),
            model: settings.codegen_model.clone(),
            max_tokens: pagehand_protocols::provider::DEFAULT_MAX_TOKENS,
            temperature: 0.2,
        }
    }

    /// Build a request for this model.
    pub fn request(&self, system: impl Into<String>, user_message: impl Into<String>) -> CompletionRequest {
        CompletionRequest::new(self.model.clone(), system, user_message)
            .with_max_tokens(self.max_tokens)
            .with_temperature(self.temperature)
    }
}

/// Routes completion requests to the configured provider.
///
/// All calls pass through one shared [`RateLimiter`] and an enforced timeout.
pub struct ModelGateway {
    providers: HashMap<ProviderKind, Arc<dyn LLMProvider>>,
    limiter: Arc<RateLimiter>,
    timeout: Duration,
}

impl ModelGateway {
    pub fn new(limiter: Arc<RateLimiter>) -> Self {
        Self {
            providers: HashMap::new(),
            limiter,
            timeout: DEFAULT_MODEL_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Register the implementation serving `kind`.
    pub fn with_provider(mut self, kind: ProviderKind, provider: Arc<dyn LLMProvider>) -> Self {
        self.providers.insert(kind, provider);
        self
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    /// Send one request and return the model's text.
    pub async fn call(
        &self,
        kind: ProviderKind,
        api_key: &str,
        request: CompletionRequest,
    ) -> Result<String, PipelineError> {
        if api_key.trim().is_empty() {
            return Err(PipelineError::Configuration(
                "API key not configured. Please add your API key in settings.".to_string(),
            ));
        }

        let provider = self.providers.get(&kind).ok_or_else(|| {
            PipelineError::Configuration(format!("Provider '{}' is not available", kind.as_str()))
        })?;

        self.limiter
            .try_acquire()
            .map_err(|wait| PipelineError::RateLimited { wait })?;

        debug!(
            "Model call: provider={}, model={}, max_tokens={}",
            provider.id(),
            request.model,
            request.max_tokens
        );

        let response = tokio::time::timeout(self.timeout, provider.complete(api_key, request))
            .await
            .map_err(|_| PipelineError::Provider(ProviderError::Timeout(self.timeout.as_secs())))??;

        debug!(
            "Model response: id={}, tokens={}",
            response.id,
            response.usage.total()
        );

        Ok(response.text)
    }

    /// Convenience wrapper taking a [`ModelConfig`].
    pub async fn complete(
        &self,
        model: &ModelConfig,
        system: &str,
        user_message: &str,
    ) -> Result<String, PipelineError> {
        self.call(model.provider, &model.api_key, model.request(system, user_message))
            .await
    }
}

#[cfg(test)]
#[path = "gateway_tests.rs"]
mod tests;

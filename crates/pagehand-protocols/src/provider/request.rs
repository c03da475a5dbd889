//! Completion request types.

use serde::{Deserialize, Serialize};

/// Default output token budget for a model call.
pub const DEFAULT_MAX_TOKENS: u32 = 1000;

/// Default sampling temperature for a model call.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Request for a completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Model to use.
    pub model: String,

    /// System prompt.
    pub system: String,

    /// The single user message.
    pub user_message: String,

    /// Maximum tokens to generate.
    pub max_tokens: u32,

    /// Temperature for sampling (0.0 - 2.0).
    pub temperature: f32,
}

impl CompletionRequest {
    /// Create a new completion request with default limits.
    pub fn new(
        model: impl Into<String>,
        system: impl Into<String>,
        user_message: impl Into<String>,
    ) -> Self {
        Self {
            model: model.into(),
            system: system.into(),
            user_message: user_message.into(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    /// Set max tokens.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Set temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

#[cfg(test)]
#[path = "request_tests.rs"]
mod tests;

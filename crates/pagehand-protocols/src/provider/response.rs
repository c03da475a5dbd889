//! Completion response types.

use serde::{Deserialize, Serialize};

/// Response from a completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    /// Unique ID for this completion.
    pub id: String,

    /// Model used.
    pub model: String,

    /// The assistant's response text.
    pub text: String,

    /// Token usage.
    #[serde(default)]
    pub usage: Usage,
}

/// Usage information for a completion.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl Usage {
    pub fn total(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }
}

//! Per-run settings snapshot.

use serde::{Deserialize, Serialize};

/// Remote model provider selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Claude,
    #[serde(alias = "open_ai")]
    OpenAI,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Claude => "claude",
            ProviderKind::OpenAI => "openai",
        }
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "claude" | "anthropic" => Ok(ProviderKind::Claude),
            "openai" => Ok(ProviderKind::OpenAI),
            other => Err(format!("unknown provider: {}", other)),
        }
    }
}

/// Immutable configuration snapshot consumed by one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub provider: ProviderKind,
    pub api_key: String,
    pub intent_model: String,
    pub codegen_model: String,
    pub max_retries: u32,
    pub confirm_destructive: bool,
    pub audio_feedback: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Claude,
            api_key: String::new(),
            intent_model: "claude-3-5-haiku-latest".to_string(),
            codegen_model: "claude-sonnet-4-20250514".to_string(),
            max_retries: 3,
            confirm_destructive: true,
            audio_feedback: false,
        }
    }
}

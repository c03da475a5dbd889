//! Configuration schema definitions.

use std::path::PathBuf;
use std::time::Duration;

use pagehand_protocols::{ProviderKind, Settings};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub provider: ProviderConfig,

    #[serde(default)]
    pub pipeline: PipelineConfig,

    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub surface: SurfaceConfig,
}

impl Config {
    /// Default config file location (`~/.pagehand/config.toml`).
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".pagehand")
            .join("config.toml")
    }

    /// Build the immutable per-run settings snapshot.
    pub fn settings(&self) -> Result<Settings, ConfigError> {
        let provider: ProviderKind =
            self.provider
                .kind
                .parse()
                .map_err(|message| ConfigError::InvalidValue {
                    field: "provider.kind".to_string(),
                    message,
                })?;

        Ok(Settings {
            provider,
            api_key: self.provider.api_key.clone(),
            intent_model: self.provider.intent_model.clone(),
            codegen_model: self.provider.codegen_model.clone(),
            max_retries: self.pipeline.max_retries,
            confirm_destructive: self.pipeline.confirm_destructive,
            audio_feedback: self.pipeline.audio_feedback,
        })
    }
}

/// Remote model provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// `claude` or `openai`.
    #[serde(default = "default_provider_kind")]
    pub kind: String,

    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_intent_model")]
    pub intent_model: String,

    #[serde(default = "default_codegen_model")]
    pub codegen_model: String,

    /// Optional endpoint override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: default_provider_kind(),
            api_key: String::new(),
            intent_model: default_intent_model(),
            codegen_model: default_codegen_model(),
            base_url: None,
        }
    }
}

impl ProviderConfig {
    /// Base URL override, ignoring empty strings.
    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref().filter(|url| !url.trim().is_empty())
    }
}

fn default_provider_kind() -> String {
    "claude".to_string()
}

fn default_intent_model() -> String {
    Settings::default().intent_model
}

fn default_codegen_model() -> String {
    Settings::default().codegen_model
}

/// Pipeline behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_true")]
    pub confirm_destructive: bool,

    #[serde(default)]
    pub audio_feedback: bool,

    #[serde(default = "default_model_timeout")]
    pub model_timeout_seconds: u64,

    #[serde(default = "default_surface_timeout")]
    pub surface_timeout_seconds: u64,

    #[serde(default = "default_settle_delay")]
    pub settle_delay_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            confirm_destructive: true,
            audio_feedback: false,
            model_timeout_seconds: default_model_timeout(),
            surface_timeout_seconds: default_surface_timeout(),
            settle_delay_ms: default_settle_delay(),
        }
    }
}

impl PipelineConfig {
    pub fn model_timeout(&self) -> Duration {
        Duration::from_secs(self.model_timeout_seconds)
    }

    pub fn surface_timeout(&self) -> Duration {
        Duration::from_secs(self.surface_timeout_seconds)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

fn default_max_retries() -> u32 {
    3
}

fn default_true() -> bool {
    true
}

fn default_model_timeout() -> u64 {
    30
}

fn default_surface_timeout() -> u64 {
    15
}

fn default_settle_delay() -> u64 {
    500
}

/// Shared model-call rate limit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_max_calls")]
    pub max_calls: usize,

    #[serde(default = "default_window")]
    pub window_seconds: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_calls: default_max_calls(),
            window_seconds: default_window(),
        }
    }
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_seconds)
    }
}

fn default_max_calls() -> usize {
    10
}

fn default_window() -> u64 {
    60
}

/// Session store bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,

    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_seconds: u64,

    #[serde(default = "default_max_messages")]
    pub max_messages: usize,

    #[serde(default = "default_max_actions")]
    pub max_actions: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_sessions: default_max_sessions(),
            idle_timeout_seconds: default_idle_timeout(),
            max_messages: default_max_messages(),
            max_actions: default_max_actions(),
        }
    }
}

impl SessionConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_seconds)
    }
}

fn default_max_sessions() -> usize {
    50
}

fn default_idle_timeout() -> u64 {
    1800
}

fn default_max_messages() -> usize {
    50
}

fn default_max_actions() -> usize {
    100
}

/// Page surface connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurfaceConfig {
    #[serde(default = "default_cdp_endpoint")]
    pub cdp_endpoint: String,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            cdp_endpoint: default_cdp_endpoint(),
        }
    }
}

fn default_cdp_endpoint() -> String {
    "http://localhost:9222".to_string()
}

#[cfg(test)]
#[path = "schema_tests.rs"]
mod tests;

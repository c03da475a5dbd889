//! Anthropic model provider for pagehand.

mod api;
mod provider;

pub use provider::AnthropicProvider;

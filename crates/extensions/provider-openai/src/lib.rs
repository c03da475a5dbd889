//! OpenAI model provider for pagehand.
//!
//! Also serves OpenAI-compatible endpoints through [`OpenAIProvider::with_url`].

mod api;
mod provider;

pub use provider::OpenAIProvider;

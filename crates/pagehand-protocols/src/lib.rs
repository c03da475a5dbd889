//! # Pagehand Protocols
//!
//! Core protocol definitions for pagehand.
//! Contains the shared data model and the collaborator traits - no pipeline logic.
//!
//! ## Core Traits
//!
//! - [`LLMProvider`] - Trait for remote model provider implementations
//! - [`PageDriver`] - Trait for the page surface (DOM primitives) of one browser

pub mod error;
pub mod provider;
pub mod surface;
pub mod types;

// Re-export core traits
pub use provider::{CompletionRequest, CompletionResponse, LLMProvider};
pub use surface::{ElementHandle, PageDriver, PageInfo, RawElement};
pub use error::{ProviderError, SurfaceError};
pub use types::*;

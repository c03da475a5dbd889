//! # Pagehand Runtime
//!
//! The command pipeline: fast-path matching, model-backed intent resolution
//! and action generation, the safety gate, execution, verification and the
//! per-surface session store that ties them together.

pub mod codegen;
pub mod error;
pub mod executor;
pub mod fast_path;
pub mod gateway;
pub mod intent;
mod json_block;
pub mod pipeline;
pub mod rate_limiter;
pub mod retry;
pub mod safety;
pub mod session;
pub mod verifier;

#[cfg(test)]
mod test_support;

pub use codegen::{ActionGenerator, CodeGenResult, GenerationRequest};
pub use error::PipelineError;
pub use executor::Executor;
pub use fast_path::FastPathMatcher;
pub use gateway::{ModelConfig, ModelGateway};
pub use intent::IntentResolver;
pub use pipeline::{CommandResponse, Pipeline, PipelineOptions, PipelineState};
pub use rate_limiter::RateLimiter;
pub use retry::{RetryContext, RetryPolicy};
pub use safety::SafetyGate;
pub use session::{
    EvictionListener, PendingClarification, PendingConfirmation, PendingInteraction, Session,
    SessionCleaner, SessionLimits, SessionStore,
};
pub use verifier::Verifier;

//! Remote model provider protocol definitions.
//!
//! Providers connect to model APIs (Anthropic, OpenAI) and turn a single
//! system prompt + user message into plain response text.

mod request;
mod response;
mod traits;

pub use request::*;
pub use response::*;
pub use traits::*;

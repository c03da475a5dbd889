//! Shared data model.

mod action;
mod command;
mod intent;
mod message;
mod safety;
mod settings;
mod snapshot;

pub use action::*;
pub use command::*;
pub use intent::*;
pub use message::*;
pub use safety::*;
pub use settings::*;
pub use snapshot::*;

#[cfg(test)]
#[path = "types_tests.rs"]
mod tests;

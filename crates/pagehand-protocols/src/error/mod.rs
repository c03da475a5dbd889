//! Error types for the pagehand protocol layer.

mod provider;
mod surface;

pub use provider::*;
pub use surface::*;

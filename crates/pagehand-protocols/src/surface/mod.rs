//! Page surface protocol definitions.
//!
//! A surface is one addressable page (a browser tab). The [`PageDriver`]
//! exposes the low-level primitives the executor composes into actions.

mod element;
mod traits;

pub use element::*;
pub use traits::*;

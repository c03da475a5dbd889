//! Chrome DevTools Protocol page driver for pagehand.
//!
//! Start Chrome with remote debugging enabled:
//!
//! ```bash
//! chrome --remote-debugging-port=9222
//! ```
//!
//! Each surface is a page target id; the driver attaches to it on first use.
//!
//! ```rust,ignore
//! let surface = CdpSurface::connect("http://localhost:9222").await?;
//! let info = surface.page_info(&target_id).await?;
//! ```

mod client;
mod error;
mod protocol;
mod scripts;
mod surface;

pub use client::CdpClient;
pub use error::CdpError;
pub use protocol::{BrowserVersion, CdpRequest, CdpResponse, TargetInfo};
pub use surface::CdpSurface;

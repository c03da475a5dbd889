//! Page driver trait definition.

use async_trait::async_trait;

use super::{ElementHandle, HistoryStep, PageInfo, RawElement, ScrollCommand};
use crate::error::SurfaceError;

/// Low-level primitives over a set of browser surfaces.
///
/// Element resolution, snapshotting and action dispatch are built on top of
/// these by the runtime; drivers only touch the page.
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// URL, title, readiness and viewport of the surface's current page.
    async fn page_info(&self, surface: &str) -> Result<PageInfo, SurfaceError>;

    /// All candidate elements in document order, with stable handles.
    async fn elements(&self, surface: &str) -> Result<Vec<RawElement>, SurfaceError>;

    /// First element matching a CSS selector.
    async fn query_selector(
        &self,
        surface: &str,
        selector: &str,
    ) -> Result<Option<ElementHandle>, SurfaceError>;

    async fn click(&self, surface: &str, handle: ElementHandle) -> Result<(), SurfaceError>;

    /// Set an input's value and dispatch `input` and `change` events.
    async fn set_value(
        &self,
        surface: &str,
        handle: ElementHandle,
        value: &str,
    ) -> Result<(), SurfaceError>;

    async fn scroll(&self, surface: &str, scroll: ScrollCommand) -> Result<(), SurfaceError>;

    async fn navigate(&self, surface: &str, url: &str) -> Result<(), SurfaceError>;

    async fn history(&self, surface: &str, step: HistoryStep) -> Result<(), SurfaceError>;

    /// Visible text of an element, or of the document body when `handle` is `None`.
    async fn read_text(
        &self,
        surface: &str,
        handle: Option<ElementHandle>,
    ) -> Result<String, SurfaceError>;

    /// Append a stylesheet to the document.
    async fn inject_style(&self, surface: &str, css: &str) -> Result<(), SurfaceError>;

    /// Run code in an isolated context with no access to page globals.
    async fn run_sandboxed(&self, surface: &str, code: &str) -> Result<String, SurfaceError>;
}

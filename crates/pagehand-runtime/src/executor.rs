//! Applies actions to a page surface and captures snapshots.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use pagehand_protocols::surface::{HistoryStep, ScrollCommand};
use pagehand_protocols::{
    truncate_chars, ActionKind, ElementDescriptor, ElementHandle, ExecutionOutcome,
    FastPathAction, GeneratedAction, PageDriver, PageSnapshot, RawElement, SurfaceError,
    CONTENT_SUMMARY_LIMIT, ELEMENT_TEXT_LIMIT,
};
use serde_json::Value;
use tracing::{debug, info};

use crate::error::PipelineError;
use crate::fast_path::DEFAULT_SCROLL_AMOUNT;
use crate::safety::SafetyGate;

/// Maximum characters returned by an extract action.
pub const EXTRACT_LIMIT: usize = 5000;

/// Default per-operation surface timeout.
pub const DEFAULT_SURFACE_TIMEOUT: Duration = Duration::from_secs(15);

/// Share of the viewport scrolled by a page-sized scroll.
const PAGE_SCROLL_RATIO: f64 = 0.9;

const LARGER_TEXT_CSS: &str = "html { font-size: 125% !important; } \
body p, body li, body span, body a, body td, body th, body label, body input, body textarea, body button \
{ font-size: 1.2rem !important; line-height: 1.6 !important; }";

const BOLD_TEXT_CSS: &str = "body, body * { font-weight: 700 !important; }";

const HIGH_CONTRAST_CSS: &str = "html { filter: contrast(1.4) !important; } \
body, body * { background-color: #000 !important; color: #fff !important; border-color: #fff !important; } \
a, a * { color: #ff0 !important; }";

/// Which elements a text lookup may land on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Want {
    Clickable,
    TextInput,
    Any,
}

/// Applies actions through a [`PageDriver`].
///
/// Holds, per surface, the id-to-handle map minted by the latest snapshot.
/// A new capture replaces the map, so ids from older snapshots stop
/// resolving. A map lives until its surface's session is dropped; see
/// [`eviction_listener`](Self::eviction_listener).
pub struct Executor {
    driver: Arc<dyn PageDriver>,
    handles: Arc<DashMap<String, HashMap<String, ElementHandle>>>,
    timeout: Duration,
}

impl Executor {
    pub fn new(driver: Arc<dyn PageDriver>) -> Self {
        Self {
            driver,
            handles: Arc::new(DashMap::new()),
            timeout: DEFAULT_SURFACE_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn driver(&self) -> &Arc<dyn PageDriver> {
        &self.driver
    }

    /// Whether a snapshot id map is held for `surface`.
    pub fn has_handles(&self, surface: &str) -> bool {
        self.handles.contains_key(surface)
    }

    /// Callback for [`SessionStore::on_evict`](crate::session::SessionStore::on_evict)
    /// that drops a surface's handle map along with its session.
    pub fn eviction_listener(&self) -> impl Fn(&str) + Send + Sync + 'static {
        let handles: Weak<DashMap<String, HashMap<String, ElementHandle>>> =
            Arc::downgrade(&self.handles);
        move |surface: &str| {
            if let Some(handles) = handles.upgrade() {
                if handles.remove(surface).is_some() {
                    debug!("Dropped element handles of {}", surface);
                }
            }
        }
    }

    async fn timed<T>(
        &self,
        fut: impl Future<Output = Result<T, SurfaceError>>,
    ) -> Result<T, SurfaceError> {
        tokio::time::timeout(self.timeout, fut)
            .await
            .map_err(|_| SurfaceError::Timeout(self.timeout.as_secs()))?
    }

    /// Capture the interactive, on-screen elements of a surface.
    pub async fn capture_snapshot(&self, surface: &str) -> Result<PageSnapshot, PipelineError> {
        let info = self.timed(self.driver.page_info(surface)).await?;
        let raw = self.timed(self.driver.elements(surface)).await?;
        let body = self.timed(self.driver.read_text(surface, None)).await?;

        let mut map = HashMap::new();
        let elements: Vec<ElementDescriptor> = raw
            .into_iter()
            .filter(|e| {
                e.interactive
                    && e.visible
                    && e.bounding_box.has_area()
                    && e.bounding_box.is_visible_in_viewport(&info.viewport)
            })
            .enumerate()
            .map(|(index, e)| {
                let id = format!("el_{}", index);
                map.insert(id.clone(), e.handle);
                ElementDescriptor {
                    id,
                    tag: e.tag.to_ascii_lowercase(),
                    role: e.role,
                    text: truncate_chars(&collapse_whitespace(&e.text), ELEMENT_TEXT_LIMIT),
                    attributes: e.attributes,
                    is_interactive: e.interactive,
                    is_visible: e.visible,
                    bounding_box: e.bounding_box,
                }
            })
            .collect();

        self.handles.insert(surface.to_string(), map);
        debug!("Captured snapshot of {}: {} elements", surface, elements.len());

        Ok(PageSnapshot {
            url: info.url,
            title: info.title,
            captured_at: Utc::now(),
            elements,
            content_summary: truncate_chars(&collapse_whitespace(&body), CONTENT_SUMMARY_LIMIT),
        })
    }

    /// Apply one generated action.
    pub async fn execute(&self, action: &GeneratedAction, surface: &str) -> ExecutionOutcome {
        debug!("Executing {} on {}: {}", action.kind, surface, action.description);
        let result = match &action.kind {
            ActionKind::Click => self.click(action, surface).await,
            ActionKind::Fill => self.fill(action, surface).await,
            ActionKind::Scroll => self.scroll(&action.payload, surface).await,
            ActionKind::Navigate => {
                let url = if action.payload.trim().is_empty() {
                    action.target.as_deref().unwrap_or_default()
                } else {
                    action.payload.as_str()
                };
                self.navigate(url, surface).await
            }
            ActionKind::Extract => self.extract(action, surface).await,
            ActionKind::Modify => self.modify(&action.payload, surface).await,
            ActionKind::Other(kind) => self.sandboxed(kind, &action.payload, surface).await,
        };
        into_outcome(result)
    }

    /// Run a fast-path action straight against the driver.
    pub async fn execute_fast_path(
        &self,
        action: FastPathAction,
        params: &HashMap<String, String>,
        surface: &str,
    ) -> ExecutionOutcome {
        let param = |key: &str| params.get(key).map(String::as_str).unwrap_or_default();
        let result = match action {
            FastPathAction::Scroll => {
                let spec = match param("position") {
                    "" => format!("{}:{}", param("direction"), param("amount")),
                    position => position.to_string(),
                };
                self.scroll(&spec, surface).await
            }
            FastPathAction::Back => self.history(HistoryStep::Back, surface).await,
            FastPathAction::Forward => self.history(HistoryStep::Forward, surface).await,
            FastPathAction::Reload => self.history(HistoryStep::Reload, surface).await,
            FastPathAction::Navigate => self.navigate(param("url"), surface).await,
            FastPathAction::ClickByText => self.click_by_text(param("text"), surface).await,
        };
        let outcome = into_outcome(result);
        // Fast-path failures are never regenerated.
        ExecutionOutcome {
            requires_retry: false,
            ..outcome
        }
    }

    async fn click(&self, action: &GeneratedAction, surface: &str) -> Result<StepResult, SurfaceError> {
        let target = action.target.as_deref().unwrap_or_default();
        let Some(handle) = self.resolve(surface, target, Want::Clickable).await? else {
            return Ok(StepResult::NotFound(target.to_string()));
        };
        self.timed(self.driver.click(surface, handle)).await?;
        Ok(StepResult::Done(format!("Clicked {}", describe(action, target))))
    }

    async fn fill(&self, action: &GeneratedAction, surface: &str) -> Result<StepResult, SurfaceError> {
        let target = action.target.as_deref().unwrap_or_default();
        let Some(handle) = self.resolve(surface, target, Want::TextInput).await? else {
            return Ok(StepResult::NotFound(target.to_string()));
        };
        self.timed(self.driver.set_value(surface, handle, &action.payload))
            .await?;
        Ok(StepResult::Done(format!("Filled {}", describe(action, target))))
    }

    async fn scroll(&self, spec: &str, surface: &str) -> Result<StepResult, SurfaceError> {
        let spec = spec.trim().to_ascii_lowercase();
        let (direction, amount) = spec
            .split_once(|c: char| c == ':' || c.is_whitespace())
            .map(|(d, a)| (d.trim(), a.trim()))
            .unwrap_or((spec.as_str(), ""));

        let command = match direction {
            "top" => ScrollCommand::Top,
            "bottom" => ScrollCommand::Bottom,
            "up" | "down" | "left" | "right" => {
                let distance = if amount == "page" {
                    let info = self.timed(self.driver.page_info(surface)).await?;
                    let extent = if matches!(direction, "up" | "down") {
                        info.viewport.height
                    } else {
                        info.viewport.width
                    };
                    (extent * PAGE_SCROLL_RATIO).round()
                } else {
                    amount
                        .trim_end_matches("px")
                        .trim()
                        .parse::<f64>()
                        .unwrap_or(DEFAULT_SCROLL_AMOUNT as f64)
                };
                match direction {
                    "up" => ScrollCommand::By { dx: 0.0, dy: -distance },
                    "down" => ScrollCommand::By { dx: 0.0, dy: distance },
                    "left" => ScrollCommand::By { dx: -distance, dy: 0.0 },
                    _ => ScrollCommand::By { dx: distance, dy: 0.0 },
                }
            }
            "" => ScrollCommand::By {
                dx: 0.0,
                dy: DEFAULT_SCROLL_AMOUNT as f64,
            },
            other => return Ok(StepResult::Failed(format!("Unknown scroll direction: {}", other))),
        };

        self.timed(self.driver.scroll(surface, command)).await?;
        let message = match command {
            ScrollCommand::Top => "Scrolled to the top".to_string(),
            ScrollCommand::Bottom => "Scrolled to the bottom".to_string(),
            ScrollCommand::By { dx, dy } => {
                format!("Scrolled {} by {}px", direction_or_down(direction), dx.abs().max(dy.abs()))
            }
        };
        Ok(StepResult::Done(message))
    }

    async fn navigate(&self, raw: &str, surface: &str) -> Result<StepResult, SurfaceError> {
        let Some(url) = normalize_url(raw) else {
            return Ok(StepResult::Failed(format!("Invalid URL: {}", raw.trim())));
        };
        self.timed(self.driver.navigate(surface, &url)).await?;
        Ok(StepResult::Done(format!("Navigated to {}", url)))
    }

    async fn history(&self, step: HistoryStep, surface: &str) -> Result<StepResult, SurfaceError> {
        self.timed(self.driver.history(surface, step)).await?;
        let message = match step {
            HistoryStep::Back => "Went back",
            HistoryStep::Forward => "Went forward",
            HistoryStep::Reload => "Reloaded the page",
        };
        Ok(StepResult::Done(message.to_string()))
    }

    async fn extract(&self, action: &GeneratedAction, surface: &str) -> Result<StepResult, SurfaceError> {
        let handle = match action.target.as_deref().filter(|t| !t.trim().is_empty()) {
            Some(target) => match self.resolve(surface, target, Want::Any).await? {
                Some(handle) => Some(handle),
                None => return Ok(StepResult::NotFound(target.to_string())),
            },
            None => None,
        };
        let text = self.timed(self.driver.read_text(surface, handle)).await?;
        let text = truncate_chars(text.trim(), EXTRACT_LIMIT);
        if text.is_empty() {
            return Ok(StepResult::Done("No text found".to_string()));
        }
        Ok(StepResult::Done(text))
    }

    async fn modify(&self, payload: &str, surface: &str) -> Result<StepResult, SurfaceError> {
        let (css, label) = style_for(payload);
        if css.trim().is_empty() {
            return Ok(StepResult::Failed("No style to apply".to_string()));
        }
        self.timed(self.driver.inject_style(surface, &css)).await?;
        Ok(StepResult::Done(format!("Applied {}", label)))
    }

    async fn sandboxed(&self, kind: &str, payload: &str, surface: &str) -> Result<StepResult, SurfaceError> {
        let code = SafetyGate::sanitize(payload);
        if code.trim().is_empty() {
            return Ok(StepResult::Failed(format!("Unsupported action type: {}", kind)));
        }
        info!("Running '{}' action in the sandbox on {}", kind, surface);
        let result = self.timed(self.driver.run_sandboxed(surface, &code)).await?;
        Ok(StepResult::Done(if result.is_empty() {
            format!("Ran {} action", kind)
        } else {
            truncate_chars(&result, EXTRACT_LIMIT)
        }))
    }

    async fn click_by_text(&self, text: &str, surface: &str) -> Result<StepResult, SurfaceError> {
        let wanted = text.trim().to_lowercase();
        let elements = self.timed(self.driver.elements(surface)).await?;
        let found = elements.iter().find(|e| {
            let attrs = &e.attributes;
            [Some(e.text.as_str()), attrs.aria_label.as_deref(), attrs.value.as_deref()]
                .into_iter()
                .flatten()
                .any(|candidate| candidate.trim().to_lowercase() == wanted)
        });

        let Some(element) = found else {
            return Ok(StepResult::Failed(format!(
                "Could not find element with text \"{}\"",
                text
            )));
        };
        self.timed(self.driver.click(surface, element.handle)).await?;
        Ok(StepResult::Done(format!("Clicked \"{}\"", text)))
    }

    /// Resolve a target: snapshot id, then CSS selector, then text.
    async fn resolve(
        &self,
        surface: &str,
        target: &str,
        want: Want,
    ) -> Result<Option<ElementHandle>, SurfaceError> {
        let target = target.trim();
        if target.is_empty() {
            return Ok(None);
        }

        let mapped = self
            .handles
            .get(surface)
            .and_then(|map| map.get(target).copied());
        if let Some(handle) = mapped {
            return Ok(Some(handle));
        }

        match self.timed(self.driver.query_selector(surface, target)).await {
            Ok(Some(handle)) => return Ok(Some(handle)),
            // Free text is not a valid selector; fall through to text search.
            Ok(None) | Err(SurfaceError::Script(_)) => {}
            Err(e) => return Err(e),
        }

        let wanted = target.to_lowercase();
        let elements = self.timed(self.driver.elements(surface)).await?;
        Ok(elements
            .iter()
            .filter(|e| e.visible && accepts(want, e))
            .find(|e| label_matches(e, &wanted))
            .map(|e| e.handle))
    }
}

/// Result of one step before it becomes an [`ExecutionOutcome`].
enum StepResult {
    Done(String),
    NotFound(String),
    Failed(String),
}

fn into_outcome(result: Result<StepResult, SurfaceError>) -> ExecutionOutcome {
    match result {
        Ok(StepResult::Done(message)) => ExecutionOutcome::success(message),
        Ok(StepResult::NotFound(target)) => {
            ExecutionOutcome::retryable(format!("Could not find element: {}", target))
        }
        Ok(StepResult::Failed(error)) => ExecutionOutcome::failure(error),
        Err(e) if e.is_retryable() => ExecutionOutcome::retryable(e.to_string()),
        Err(e) => ExecutionOutcome::failure(e.to_string()),
    }
}

fn accepts(want: Want, element: &RawElement) -> bool {
    match want {
        Want::Clickable => element.interactive,
        Want::TextInput => element.is_text_input(),
        Want::Any => true,
    }
}

fn label_matches(element: &RawElement, wanted: &str) -> bool {
    let attrs = &element.attributes;
    [
        Some(element.text.as_str()),
        attrs.aria_label.as_deref(),
        attrs.placeholder.as_deref(),
        attrs.value.as_deref(),
        attrs.title.as_deref(),
        attrs.name.as_deref(),
    ]
    .into_iter()
    .flatten()
    .any(|candidate| !candidate.is_empty() && candidate.to_lowercase().contains(wanted))
}

fn describe<'a>(action: &'a GeneratedAction, target: &'a str) -> &'a str {
    if action.description.is_empty() {
        target
    } else {
        action.description.as_str()
    }
}

fn direction_or_down(direction: &str) -> &str {
    if direction.is_empty() { "down" } else { direction }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Absolute http(s) URL for user input, adding `https://` when missing.
pub fn normalize_url(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let candidate = if raw.contains("://") {
        raw.to_string()
    } else {
        format!("https://{}", raw)
    };
    let url = url::Url::parse(&candidate).ok()?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return None;
    }
    Some(url.to_string())
}

/// CSS for a modify payload and a label for the message.
fn style_for(payload: &str) -> (String, String) {
    let trimmed = payload.trim();

    if let Ok(Value::Object(obj)) = serde_json::from_str::<Value>(trimmed) {
        if let Some(css) = obj.get("preset").and_then(Value::as_str).and_then(preset_css) {
            return (css.to_string(), "style preset".to_string());
        }
        if let Some(css) = obj.get("css").and_then(Value::as_str) {
            return (css.to_string(), "custom style".to_string());
        }
    }

    match preset_css(trimmed) {
        Some(css) => (css.to_string(), "style preset".to_string()),
        None => (trimmed.to_string(), "custom style".to_string()),
    }
}

fn preset_css(name: &str) -> Option<&'static str> {
    let key: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase();
    match key.as_str() {
        "largertext" | "largetext" | "enlargetext" | "biggertext" | "increasetextsize" => {
            Some(LARGER_TEXT_CSS)
        }
        "boldtext" | "bold" => Some(BOLD_TEXT_CSS),
        "highcontrast" | "contrast" => Some(HIGH_CONTRAST_CSS),
        _ => None,
    }
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;

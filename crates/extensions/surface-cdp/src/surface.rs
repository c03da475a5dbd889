//! [`PageDriver`] over a CDP connection.

use async_trait::async_trait;
use dashmap::DashMap;
use pagehand_protocols::surface::{HistoryStep, ScrollCommand};
use pagehand_protocols::{ElementHandle, PageDriver, PageInfo, RawElement, SurfaceError};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::client::CdpClient;
use crate::error::CdpError;
use crate::protocol::{evaluation_value, TargetInfo};
use crate::scripts;

const ISOLATED_WORLD: &str = "pagehand";

/// Browser surfaces addressed by page target id.
pub struct CdpSurface {
    client: CdpClient,
    /// target id -> flattened session id
    sessions: DashMap<String, String>,
}

impl CdpSurface {
    pub async fn connect(endpoint: &str) -> Result<Self, CdpError> {
        let client = CdpClient::connect(endpoint).await?;
        info!("Connected to {}", client.browser());
        Ok(Self::from_client(client))
    }

    pub fn from_client(client: CdpClient) -> Self {
        Self {
            client,
            sessions: DashMap::new(),
        }
    }

    /// Page targets currently open in the browser.
    pub async fn targets(&self) -> Result<Vec<TargetInfo>, CdpError> {
        Ok(self
            .client
            .list_targets()
            .await?
            .into_iter()
            .filter(TargetInfo::is_page)
            .collect())
    }

    /// The first open page, used when no target is named.
    pub async fn first_page(&self) -> Result<TargetInfo, CdpError> {
        self.targets()
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| CdpError::PageNotFound("no open page targets".to_string()))
    }

    async fn session_for(&self, surface: &str) -> Result<String, CdpError> {
        if let Some(session) = self.sessions.get(surface) {
            return Ok(session.clone());
        }
        let session = self.client.attach(surface).await?;
        self.sessions.insert(surface.to_string(), session.clone());
        Ok(session)
    }

    async fn call(
        &self,
        surface: &str,
        method: &str,
        params: Option<Value>,
    ) -> Result<Value, CdpError> {
        let session = self.session_for(surface).await?;
        let result = self.client.call(method, params, Some(&session)).await;
        if matches!(result, Err(CdpError::Protocol { .. })) && method != "Runtime.evaluate" {
            // the tab may have been closed; attach again on next use
            self.sessions.remove(surface);
        }
        result
    }

    async fn evaluate(&self, surface: &str, expression: &str) -> Result<Value, CdpError> {
        let reply = self
            .call(
                surface,
                "Runtime.evaluate",
                Some(json!({
                    "expression": expression,
                    "returnByValue": true,
                    "awaitPromise": true
                })),
            )
            .await?;
        evaluation_value(reply)
    }

    async fn evaluate_as<T: DeserializeOwned>(
        &self,
        surface: &str,
        expression: &str,
    ) -> Result<T, CdpError> {
        let value = self.evaluate(surface, expression).await?;
        serde_json::from_value(value).map_err(|e| CdpError::InvalidResponse(e.to_string()))
    }

    /// Evaluate a script that returns `false` when its handle is gone.
    async fn on_handle(
        &self,
        surface: &str,
        handle: ElementHandle,
        expression: &str,
    ) -> Result<(), SurfaceError> {
        match self.evaluate(surface, expression).await? {
            Value::Bool(false) => Err(SurfaceError::ElementGone(handle.0)),
            _ => Ok(()),
        }
    }

    async fn history_step(&self, surface: &str, offset: i64) -> Result<(), CdpError> {
        let history = self.call(surface, "Page.getNavigationHistory", None).await?;
        let current = history["currentIndex"].as_i64().unwrap_or(0);
        let target = current + offset;
        let entry = usize::try_from(target)
            .ok()
            .and_then(|index| history["entries"].as_array()?.get(index));
        let Some(entry_id) = entry.and_then(|e| e["id"].as_i64()) else {
            return Err(CdpError::NavigationFailed(format!(
                "no history entry at offset {}",
                offset
            )));
        };
        self.call(
            surface,
            "Page.navigateToHistoryEntry",
            Some(json!({"entryId": entry_id})),
        )
        .await?;
        Ok(())
    }

    async fn isolated_context(&self, surface: &str) -> Result<i64, CdpError> {
        let tree = self.call(surface, "Page.getFrameTree", None).await?;
        let frame_id = tree["frameTree"]["frame"]["id"]
            .as_str()
            .ok_or_else(|| CdpError::InvalidResponse("Missing frame id".to_string()))?
            .to_string();
        let world = self
            .call(
                surface,
                "Page.createIsolatedWorld",
                Some(json!({
                    "frameId": frame_id,
                    "worldName": ISOLATED_WORLD
                })),
            )
            .await?;
        world["executionContextId"]
            .as_i64()
            .ok_or_else(|| CdpError::InvalidResponse("Missing executionContextId".to_string()))
    }
}

#[async_trait]
impl PageDriver for CdpSurface {
    async fn page_info(&self, surface: &str) -> Result<PageInfo, SurfaceError> {
        Ok(self.evaluate_as(surface, &scripts::page_info()).await?)
    }

    async fn elements(&self, surface: &str) -> Result<Vec<RawElement>, SurfaceError> {
        let elements: Vec<RawElement> = self.evaluate_as(surface, &scripts::elements()).await?;
        debug!(surface, count = elements.len(), "Collected elements");
        Ok(elements)
    }

    async fn query_selector(
        &self,
        surface: &str,
        selector: &str,
    ) -> Result<Option<ElementHandle>, SurfaceError> {
        let handle: Option<u64> = self
            .evaluate_as(surface, &scripts::query_selector(selector))
            .await?;
        Ok(handle.map(ElementHandle))
    }

    async fn click(&self, surface: &str, handle: ElementHandle) -> Result<(), SurfaceError> {
        self.on_handle(surface, handle, &scripts::click(handle)).await
    }

    async fn set_value(
        &self,
        surface: &str,
        handle: ElementHandle,
        value: &str,
    ) -> Result<(), SurfaceError> {
        self.on_handle(surface, handle, &scripts::set_value(handle, value))
            .await
    }

    async fn scroll(&self, surface: &str, scroll: ScrollCommand) -> Result<(), SurfaceError> {
        let script = match scroll {
            ScrollCommand::By { dx, dy } => scripts::scroll_by(dx, dy),
            ScrollCommand::Top => scripts::scroll_to_top(),
            ScrollCommand::Bottom => scripts::scroll_to_bottom(),
        };
        self.evaluate(surface, &script).await?;
        Ok(())
    }

    async fn navigate(&self, surface: &str, url: &str) -> Result<(), SurfaceError> {
        let result = self
            .call(surface, "Page.navigate", Some(json!({"url": url})))
            .await?;
        if let Some(error) = result.get("errorText").and_then(Value::as_str) {
            return Err(CdpError::NavigationFailed(format!("{}: {}", url, error)).into());
        }
        debug!(surface, url, "Navigated");
        Ok(())
    }

    async fn history(&self, surface: &str, step: HistoryStep) -> Result<(), SurfaceError> {
        match step {
            HistoryStep::Back => self.history_step(surface, -1).await?,
            HistoryStep::Forward => self.history_step(surface, 1).await?,
            HistoryStep::Reload => {
                self.call(surface, "Page.reload", None).await?;
            }
        }
        Ok(())
    }

    async fn read_text(
        &self,
        surface: &str,
        handle: Option<ElementHandle>,
    ) -> Result<String, SurfaceError> {
        match self.evaluate(surface, &scripts::read_text(handle)).await? {
            Value::String(text) => Ok(text),
            Value::Null => match handle {
                Some(handle) => Err(SurfaceError::ElementGone(handle.0)),
                None => Ok(String::new()),
            },
            other => Ok(other.to_string()),
        }
    }

    async fn inject_style(&self, surface: &str, css: &str) -> Result<(), SurfaceError> {
        self.evaluate(surface, &scripts::inject_style(css)).await?;
        Ok(())
    }

    async fn run_sandboxed(&self, surface: &str, code: &str) -> Result<String, SurfaceError> {
        let context_id = self.isolated_context(surface).await?;
        let reply = self
            .call(
                surface,
                "Runtime.evaluate",
                Some(json!({
                    "expression": scripts::sandboxed(code),
                    "contextId": context_id,
                    "returnByValue": true,
                    "awaitPromise": true
                })),
            )
            .await?;
        match evaluation_value(reply)? {
            Value::String(text) => Ok(text),
            Value::Null => Ok(String::new()),
            other => Ok(other.to_string()),
        }
    }
}

//! Test doubles shared by the runtime's unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use pagehand_protocols::surface::{
    BoundingBox, ElementAttributes, HistoryStep, ReadyState, ScrollCommand, Viewport,
};
use pagehand_protocols::{
    CompletionRequest, CompletionResponse, ElementHandle, LLMProvider, PageDriver, PageInfo,
    ProviderError, RawElement, SurfaceError,
};

/// Provider returning queued responses in order and counting calls.
pub struct ScriptedProvider {
    responses: Mutex<VecDeque<Result<String, ProviderError>>>,
    requests: Mutex<Vec<CompletionRequest>>,
    calls: AtomicUsize,
    delay: Option<Duration>,
    fallback: Option<String>,
}

impl ScriptedProvider {
    pub fn new(responses: Vec<&str>) -> Self {
        Self::from_results(responses.into_iter().map(|r| Ok(r.to_string())).collect())
    }

    pub fn from_results(responses: Vec<Result<String, ProviderError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            delay: None,
            fallback: None,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Response returned once the queue is empty.
    pub fn with_fallback(mut self, text: &str) -> Self {
        self.fallback = Some(text.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl LLMProvider for ScriptedProvider {
    fn id(&self) -> &str {
        "scripted"
    }

    async fn complete(
        &self,
        _api_key: &str,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let model = request.model.clone();
        self.requests.lock().push(request);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let next = self.responses.lock().pop_front();
        let text = match next {
            Some(result) => result?,
            None => match &self.fallback {
                Some(text) => text.clone(),
                None => {
                    return Err(ProviderError::InvalidRequest(
                        "no scripted response left".to_string(),
                    ));
                }
            },
        };

        Ok(CompletionResponse {
            id: format!("resp_{}", self.calls()),
            model,
            text,
            usage: Default::default(),
        })
    }
}

/// In-memory page with a fixed element list that records every operation.
pub struct MockDriver {
    pub info: Mutex<PageInfo>,
    pub elements: Mutex<Vec<RawElement>>,
    pub body_text: Mutex<String>,
    ops: Mutex<Vec<String>>,
    fail_clicks: Mutex<Option<SurfaceError>>,
    stall_page_info: AtomicBool,
}

impl MockDriver {
    pub fn new(elements: Vec<RawElement>) -> Self {
        Self {
            info: Mutex::new(PageInfo {
                url: "https://example.com/".to_string(),
                title: "Example".to_string(),
                ready_state: ReadyState::Complete,
                viewport: Viewport::default(),
            }),
            elements: Mutex::new(elements),
            body_text: Mutex::new("Welcome to Example".to_string()),
            ops: Mutex::new(Vec::new()),
            fail_clicks: Mutex::new(None),
            stall_page_info: AtomicBool::new(false),
        }
    }

    /// Make every click fail with `error`.
    pub fn fail_clicks_with(&self, error: SurfaceError) {
        *self.fail_clicks.lock() = Some(error);
    }

    /// Make `page_info` never resolve.
    pub fn stall_page_info(&self) {
        self.stall_page_info.store(true, Ordering::SeqCst);
    }

    pub fn ops(&self) -> Vec<String> {
        self.ops.lock().clone()
    }

    fn record(&self, op: String) {
        self.ops.lock().push(op);
    }

    fn known(&self, handle: ElementHandle) -> Result<(), SurfaceError> {
        if self.elements.lock().iter().any(|e| e.handle == handle) {
            Ok(())
        } else {
            Err(SurfaceError::ElementGone(handle.0))
        }
    }
}

/// A visible, interactive element inside the default viewport.
pub fn element(handle: u64, tag: &str, text: &str) -> RawElement {
    RawElement {
        handle: ElementHandle(handle),
        tag: tag.to_string(),
        role: None,
        text: text.to_string(),
        attributes: ElementAttributes::default(),
        interactive: true,
        visible: true,
        bounding_box: BoundingBox::new(10.0, 10.0 + handle as f64 * 30.0, 120.0, 24.0),
    }
}

/// A text input with a placeholder.
pub fn input(handle: u64, placeholder: &str) -> RawElement {
    let mut el = element(handle, "input", "");
    el.attributes.r#type = Some("text".to_string());
    el.attributes.placeholder = Some(placeholder.to_string());
    el
}

#[async_trait]
impl PageDriver for MockDriver {
    async fn page_info(&self, _surface: &str) -> Result<PageInfo, SurfaceError> {
        if self.stall_page_info.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        Ok(self.info.lock().clone())
    }

    async fn elements(&self, _surface: &str) -> Result<Vec<RawElement>, SurfaceError> {
        Ok(self.elements.lock().clone())
    }

    async fn query_selector(
        &self,
        _surface: &str,
        selector: &str,
    ) -> Result<Option<ElementHandle>, SurfaceError> {
        let Some(id) = selector.strip_prefix('#') else {
            return Ok(None);
        };
        Ok(self
            .elements
            .lock()
            .iter()
            .find(|e| e.attributes.id.as_deref() == Some(id))
            .map(|e| e.handle))
    }

    async fn click(&self, _surface: &str, handle: ElementHandle) -> Result<(), SurfaceError> {
        if let Some(error) = self.fail_clicks.lock().as_ref() {
            return Err(match error {
                SurfaceError::ElementGone(id) => SurfaceError::ElementGone(*id),
                SurfaceError::Timeout(secs) => SurfaceError::Timeout(*secs),
                other => SurfaceError::Driver(other.to_string()),
            });
        }
        self.known(handle)?;
        self.record(format!("click {}", handle.0));
        Ok(())
    }

    async fn set_value(
        &self,
        _surface: &str,
        handle: ElementHandle,
        value: &str,
    ) -> Result<(), SurfaceError> {
        self.known(handle)?;
        self.record(format!("fill {} {}", handle.0, value));
        Ok(())
    }

    async fn scroll(&self, _surface: &str, scroll: ScrollCommand) -> Result<(), SurfaceError> {
        let op = match scroll {
            ScrollCommand::By { dx, dy } => format!("scroll {} {}", dx, dy),
            ScrollCommand::Top => "scroll top".to_string(),
            ScrollCommand::Bottom => "scroll bottom".to_string(),
        };
        self.record(op);
        Ok(())
    }

    async fn navigate(&self, _surface: &str, url: &str) -> Result<(), SurfaceError> {
        self.record(format!("navigate {}", url));
        self.info.lock().url = url.to_string();
        Ok(())
    }

    async fn history(&self, _surface: &str, step: HistoryStep) -> Result<(), SurfaceError> {
        self.record(format!("history {:?}", step).to_lowercase());
        Ok(())
    }

    async fn read_text(
        &self,
        _surface: &str,
        handle: Option<ElementHandle>,
    ) -> Result<String, SurfaceError> {
        match handle {
            Some(handle) => self
                .elements
                .lock()
                .iter()
                .find(|e| e.handle == handle)
                .map(|e| e.text.clone())
                .ok_or(SurfaceError::ElementGone(handle.0)),
            None => Ok(self.body_text.lock().clone()),
        }
    }

    async fn inject_style(&self, _surface: &str, css: &str) -> Result<(), SurfaceError> {
        self.record(format!("style {}", css));
        Ok(())
    }

    async fn run_sandboxed(&self, _surface: &str, code: &str) -> Result<String, SurfaceError> {
        self.record(format!("sandbox {}", code));
        Ok(String::new())
    }
}

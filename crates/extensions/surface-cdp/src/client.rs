//! CDP WebSocket client.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, trace, warn};

use crate::error::CdpError;
use crate::protocol::{BrowserVersion, CdpRequest, CdpResponse, TargetInfo};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

type PendingMap = Arc<Mutex<HashMap<u64, oneshot::Sender<Result<Value, CdpError>>>>>;

/// Default time to wait for a command reply.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// CDP client over the browser-level WebSocket.
///
/// Page commands are routed with flattened session ids, so one connection
/// serves every attached tab.
pub struct CdpClient {
    /// HTTP endpoint for target discovery.
    http_endpoint: String,
    browser: String,
    ws_tx: tokio::sync::Mutex<WsSink>,
    request_id: AtomicU64,
    /// Requests waiting for their reply.
    pending: PendingMap,
    request_timeout: Duration,
    recv_task: tokio::task::JoinHandle<()>,
}

impl CdpClient {
    /// Connect to Chrome at `endpoint` (e.g. `http://localhost:9222`).
    pub async fn connect(endpoint: &str) -> Result<Self, CdpError> {
        let http_endpoint = endpoint.trim_end_matches('/').to_string();
        url::Url::parse(&http_endpoint)?;

        let version_url = format!("{}/json/version", http_endpoint);
        debug!("Fetching browser version from {}", version_url);

        let version: BrowserVersion = reqwest::get(&version_url)
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| CdpError::ChromeNotAvailable(format!("{}: {}", endpoint, e)))?
            .json()
            .await
            .map_err(|e| CdpError::ChromeNotAvailable(format!("{}: {}", endpoint, e)))?;

        let (ws_stream, _) = tokio_tungstenite::connect_async(&version.web_socket_debugger_url)
            .await
            .map_err(|e| CdpError::ConnectionFailed(format!("WebSocket: {}", e)))?;

        let (ws_sink, ws_source) = ws_stream.split();
        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let recv_task = tokio::spawn(Self::receive_loop(ws_source, pending.clone()));

        debug!("CDP client connected to {} ({})", version.browser, version.web_socket_debugger_url);

        Ok(Self {
            http_endpoint,
            browser: version.browser,
            ws_tx: tokio::sync::Mutex::new(ws_sink),
            request_id: AtomicU64::new(1),
            pending,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            recv_task,
        })
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Browser product string, e.g. `Chrome/126.0.0.0`.
    pub fn browser(&self) -> &str {
        &self.browser
    }

    async fn receive_loop(mut ws_source: WsSource, pending: PendingMap) {
        while let Some(msg) = ws_source.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    trace!("CDP recv: {}", text);
                    let resp = match serde_json::from_str::<CdpResponse>(&text) {
                        Ok(resp) => resp,
                        Err(e) => {
                            warn!("Failed to parse CDP message: {}", e);
                            continue;
                        }
                    };
                    let Some(id) = resp.id else {
                        // events are not consumed
                        continue;
                    };
                    if let Some(tx) = pending.lock().remove(&id) {
                        let result = match resp.error {
                            Some(error) => Err(CdpError::Protocol {
                                code: error.code,
                                message: error.message,
                            }),
                            None => Ok(resp.result.unwrap_or(Value::Null)),
                        };
                        let _ = tx.send(result);
                    }
                }
                Ok(Message::Close(_)) => {
                    debug!("WebSocket closed");
                    break;
                }
                Err(e) => {
                    error!("WebSocket error: {}", e);
                    break;
                }
                _ => {}
            }
        }
        // fail everything still waiting
        pending.lock().clear();
    }

    /// Send a CDP command and wait for its reply.
    pub async fn call(
        &self,
        method: &str,
        params: Option<Value>,
        session_id: Option<&str>,
    ) -> Result<Value, CdpError> {
        let id = self.request_id.fetch_add(1, Ordering::SeqCst);

        let request = CdpRequest {
            id,
            method: method.to_string(),
            params,
            session_id: session_id.map(|s| s.to_string()),
        };

        let json = serde_json::to_string(&request)?;
        trace!("CDP send: {}", json);

        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(id, tx);

        {
            let mut ws = self.ws_tx.lock().await;
            if let Err(e) = ws.send(Message::Text(json.into())).await {
                self.pending.lock().remove(&id);
                return Err(e.into());
            }
        }

        match tokio::time::timeout(self.request_timeout, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(CdpError::SessionClosed),
            Err(_) => {
                self.pending.lock().remove(&id);
                Err(CdpError::Timeout {
                    method: method.to_string(),
                    seconds: self.request_timeout.as_secs(),
                })
            }
        }
    }

    /// List targets through the HTTP endpoint.
    pub async fn list_targets(&self) -> Result<Vec<TargetInfo>, CdpError> {
        list_targets(&self.http_endpoint).await
    }

    /// Attach to a page target and return the flattened session id.
    pub async fn attach(&self, target_id: &str) -> Result<String, CdpError> {
        let result = self
            .call(
                "Target.attachToTarget",
                Some(json!({
                    "targetId": target_id,
                    "flatten": true
                })),
                None,
            )
            .await
            .map_err(|e| match e {
                CdpError::Protocol { .. } => CdpError::PageNotFound(target_id.to_string()),
                other => other,
            })?;

        let session_id = result["sessionId"]
            .as_str()
            .ok_or_else(|| CdpError::InvalidResponse("Missing sessionId".to_string()))?
            .to_string();

        self.call("Page.enable", None, Some(&session_id)).await?;
        self.call("Runtime.enable", None, Some(&session_id)).await?;

        debug!("Attached to target {} (session {})", target_id, session_id);
        Ok(session_id)
    }
}

impl Drop for CdpClient {
    fn drop(&mut self) {
        self.recv_task.abort();
    }
}

/// Targets known to the browser at `endpoint`.
pub(crate) async fn list_targets(endpoint: &str) -> Result<Vec<TargetInfo>, CdpError> {
    let url = format!("{}/json/list", endpoint.trim_end_matches('/'));
    let targets: Vec<TargetInfo> = reqwest::get(&url)
        .await?
        .error_for_status()?
        .json()
        .await?;
    Ok(targets)
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;

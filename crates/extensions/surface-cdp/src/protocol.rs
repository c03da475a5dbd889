//! CDP protocol types and message definitions.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CdpError;

/// CDP request message.
#[derive(Debug, Serialize)]
pub struct CdpRequest {
    pub id: u64,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "sessionId")]
    pub session_id: Option<String>,
}

/// CDP response or event message.
#[derive(Debug, Deserialize)]
pub struct CdpResponse {
    pub id: Option<u64>,
    pub result: Option<Value>,
    pub error: Option<CdpErrorResponse>,
    pub method: Option<String>,
    #[serde(rename = "sessionId")]
    pub session_id: Option<String>,
}

/// CDP error in response.
#[derive(Debug, Deserialize)]
pub struct CdpErrorResponse {
    pub code: i64,
    pub message: String,
}

/// Target entry from the `/json/list` endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetInfo {
    pub id: String,
    #[serde(rename = "type")]
    pub target_type: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
}

impl TargetInfo {
    pub fn is_page(&self) -> bool {
        self.target_type == "page"
    }
}

/// Browser version info.
///
/// Chrome returns PascalCase field names for this endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct BrowserVersion {
    #[serde(rename = "Browser")]
    pub browser: String,
    #[serde(rename = "Protocol-Version", default)]
    pub protocol_version: String,
    #[serde(rename = "webSocketDebuggerUrl")]
    pub web_socket_debugger_url: String,
}

/// Unwrap the `result.value` of a `Runtime.evaluate` reply.
pub(crate) fn evaluation_value(mut reply: Value) -> Result<Value, CdpError> {
    if let Some(exception) = reply.get("exceptionDetails") {
        let text = exception["exception"]["description"]
            .as_str()
            .or_else(|| exception["text"].as_str())
            .unwrap_or("Unknown error");
        return Err(CdpError::JavaScript(text.to_string()));
    }
    Ok(reply
        .get_mut("result")
        .and_then(|r| r.get_mut("value"))
        .map(Value::take)
        .unwrap_or(Value::Null))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_serialize() {
        let req = CdpRequest {
            id: 1,
            method: "Page.navigate".to_string(),
            params: Some(json!({"url": "https://example.com"})),
            session_id: Some("S1".to_string()),
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["method"], "Page.navigate");
        assert_eq!(json["sessionId"], "S1");
    }

    #[test]
    fn test_request_without_session() {
        let req = CdpRequest {
            id: 2,
            method: "Target.getTargets".to_string(),
            params: None,
            session_id: None,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert!(json.get("sessionId").is_none());
        assert!(json.get("params").is_none());
    }

    #[test]
    fn test_response_and_event() {
        let resp: CdpResponse =
            serde_json::from_str(r#"{"id": 1, "result": {"frameId": "abc"}}"#).unwrap();
        assert_eq!(resp.id, Some(1));
        assert!(resp.result.is_some());

        let event: CdpResponse = serde_json::from_str(
            r#"{"method": "Page.loadEventFired", "params": {}, "sessionId": "S1"}"#,
        )
        .unwrap();
        assert!(event.id.is_none());
        assert_eq!(event.method.as_deref(), Some("Page.loadEventFired"));
    }

    #[test]
    fn test_target_info() {
        let json = r#"[
            {"id": "P1", "type": "page", "title": "Example", "url": "https://example.com",
             "webSocketDebuggerUrl": "ws://localhost:9222/devtools/page/P1"},
            {"id": "W1", "type": "service_worker", "url": "https://example.com/sw.js"}
        ]"#;
        let targets: Vec<TargetInfo> = serde_json::from_str(json).unwrap();
        assert!(targets[0].is_page());
        assert!(!targets[1].is_page());
        assert_eq!(targets[1].title, "");
    }

    #[test]
    fn test_browser_version() {
        let json = r#"{
            "Browser": "Chrome/126.0.0.0",
            "Protocol-Version": "1.3",
            "User-Agent": "Mozilla/5.0",
            "webSocketDebuggerUrl": "ws://localhost:9222/devtools/browser/abc"
        }"#;
        let version: BrowserVersion = serde_json::from_str(json).unwrap();
        assert_eq!(version.browser, "Chrome/126.0.0.0");
        assert!(version.web_socket_debugger_url.starts_with("ws://"));
    }

    #[test]
    fn test_evaluation_value() {
        let value = evaluation_value(json!({"result": {"type": "string", "value": "ok"}})).unwrap();
        assert_eq!(value, "ok");

        let value = evaluation_value(json!({"result": {"type": "undefined"}})).unwrap();
        assert!(value.is_null());
    }

    #[test]
    fn test_evaluation_exception() {
        let reply = json!({
            "result": {"type": "object", "subtype": "error"},
            "exceptionDetails": {
                "text": "Uncaught",
                "exception": {"description": "SyntaxError: 'div[' is not a valid selector"}
            }
        });
        match evaluation_value(reply).unwrap_err() {
            CdpError::JavaScript(message) => assert!(message.contains("not a valid selector")),
            other => panic!("unexpected error: {:?}", other),
        }
    }
}

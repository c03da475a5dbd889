//! CDP error types.

use pagehand_protocols::SurfaceError;
use thiserror::Error;

/// CDP client errors.
#[derive(Debug, Error)]
pub enum CdpError {
    /// Failed to connect to Chrome.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Chrome not found or not running with remote debugging.
    #[error("Chrome not available at {0}. Start Chrome with: chrome --remote-debugging-port=9222")]
    ChromeNotAvailable(String),

    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// Error object returned for a CDP command.
    #[error("CDP error: {message} (code: {code})")]
    Protocol { code: i64, message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP error (for endpoint discovery).
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Page not found: {0}")]
    PageNotFound(String),

    #[error("Navigation failed: {0}")]
    NavigationFailed(String),

    /// Exception thrown by evaluated JavaScript.
    #[error("JavaScript error: {0}")]
    JavaScript(String),

    #[error("Request {method} timed out after {seconds}s")]
    Timeout { method: String, seconds: u64 },

    #[error("Session closed")]
    SessionClosed,

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl From<tokio_tungstenite::tungstenite::Error> for CdpError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        CdpError::WebSocket(e.to_string())
    }
}

impl From<reqwest::Error> for CdpError {
    fn from(e: reqwest::Error) -> Self {
        CdpError::Http(e.to_string())
    }
}

impl From<url::ParseError> for CdpError {
    fn from(e: url::ParseError) -> Self {
        CdpError::ConnectionFailed(format!("Invalid URL: {}", e))
    }
}

impl From<CdpError> for SurfaceError {
    fn from(e: CdpError) -> Self {
        match e {
            CdpError::PageNotFound(target) => SurfaceError::NotFound(target),
            CdpError::JavaScript(message) => SurfaceError::Script(message),
            CdpError::Timeout { seconds, .. } => SurfaceError::Timeout(seconds),
            other => SurfaceError::Driver(other.to_string()),
        }
    }
}

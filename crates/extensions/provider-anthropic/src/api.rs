//! Anthropic Messages API types.

use serde::{Deserialize, Serialize};

/// Messages API request.
#[derive(Debug, Serialize)]
pub struct ApiRequest {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub system: String,
    pub messages: Vec<ApiMessage>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiMessage {
    pub role: String,
    pub content: String,
}

/// Messages API response.
#[derive(Debug, Deserialize)]
pub struct ApiResponse {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub content: Vec<ContentBlock>,
    #[serde(default)]
    pub usage: ApiUsage,
}

impl ApiResponse {
    /// Text of the first text block, if any.
    pub fn text(&self) -> Option<&str> {
        self.content.iter().find_map(|block| match block {
            ContentBlock::Text { text } => Some(text.as_str()),
            ContentBlock::Other => None,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text { text: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Default, Deserialize)]
pub struct ApiUsage {
    #[serde(default)]
    pub input_tokens: u32,
    #[serde(default)]
    pub output_tokens: u32,
}

/// Error body: `{"error": {"type": "...", "message": "..."}}`.
#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    pub error: ApiError,
}

#[derive(Debug, Deserialize)]
pub struct ApiError {
    #[serde(rename = "type", default)]
    pub error_type: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization() {
        let request = ApiRequest {
            model: "claude-sonnet-4-20250514".to_string(),
            max_tokens: 1000,
            temperature: 0.2,
            system: "You are helpful".to_string(),
            messages: vec![ApiMessage {
                role: "user".to_string(),
                content: "Hello".to_string(),
            }],
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "claude-sonnet-4-20250514");
        assert_eq!(json["max_tokens"], 1000);
        assert_eq!(json["system"], "You are helpful");
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"], "Hello");
    }

    #[test]
    fn test_empty_system_is_skipped() {
        let request = ApiRequest {
            model: "m".to_string(),
            max_tokens: 10,
            temperature: 0.0,
            system: String::new(),
            messages: vec![],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("system").is_none());
    }

    #[test]
    fn test_response_text_skips_other_blocks() {
        let json = r#"{
            "id": "msg_1",
            "model": "claude-sonnet-4-20250514",
            "content": [
                {"type": "thinking", "thinking": "hmm"},
                {"type": "text", "text": "{\"clear\": true}"}
            ],
            "usage": {"input_tokens": 12, "output_tokens": 5}
        }"#;
        let response: ApiResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.text(), Some("{\"clear\": true}"));
        assert_eq!(response.usage.input_tokens, 12);
    }

    #[test]
    fn test_response_without_content() {
        let response: ApiResponse = serde_json::from_str(r#"{"id": "msg_2"}"#).unwrap();
        assert!(response.text().is_none());
    }

    #[test]
    fn test_error_body() {
        let body: ApiErrorBody = serde_json::from_str(
            r#"{"type": "error", "error": {"type": "authentication_error", "message": "invalid x-api-key"}}"#,
        )
        .unwrap();
        assert_eq!(body.error.error_type, "authentication_error");
        assert_eq!(body.error.message, "invalid x-api-key");
    }
}

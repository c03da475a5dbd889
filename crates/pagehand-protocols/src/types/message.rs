//! Conversation and action history entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::GeneratedAction;

/// Role of a conversation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
            MessageRole::System => "system",
        }
    }
}

/// A message in a surface's conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<GeneratedAction>,
    #[serde(default)]
    pub is_error: bool,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
            actions: Vec::new(),
            is_error: false,
        }
    }

    pub fn with_actions(mut self, actions: Vec<GeneratedAction>) -> Self {
        self.actions = actions;
        self
    }

    pub fn as_error(mut self) -> Self {
        self.is_error = true;
        self
    }
}

/// One attempted action in a session's log.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionRecord {
    pub action: GeneratedAction,
    pub success: bool,
    pub timestamp: DateTime<Utc>,
}

impl ActionRecord {
    pub fn new(action: GeneratedAction, success: bool) -> Self {
        Self {
            action,
            success,
            timestamp: Utc::now(),
        }
    }
}

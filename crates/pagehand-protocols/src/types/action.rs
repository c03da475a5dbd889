//! Actions, their outcomes, and fast-path matches.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Kind of page action.
///
/// Unknown kinds from the model are kept as [`ActionKind::Other`] and only
/// ever reach the sandboxed fallback.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ActionKind {
    Click,
    Fill,
    Scroll,
    Navigate,
    Extract,
    Modify,
    Other(String),
}

impl ActionKind {
    pub fn parse(kind: &str) -> Self {
        match kind.trim().to_ascii_lowercase().as_str() {
            "click" => ActionKind::Click,
            "fill" | "type" | "input" => ActionKind::Fill,
            "scroll" => ActionKind::Scroll,
            "navigate" | "goto" => ActionKind::Navigate,
            "extract" | "read" => ActionKind::Extract,
            "modify" | "style" => ActionKind::Modify,
            other => ActionKind::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ActionKind::Click => "click",
            ActionKind::Fill => "fill",
            ActionKind::Scroll => "scroll",
            ActionKind::Navigate => "navigate",
            ActionKind::Extract => "extract",
            ActionKind::Modify => "modify",
            ActionKind::Other(kind) => kind,
        }
    }
}

impl From<String> for ActionKind {
    fn from(value: String) -> Self {
        ActionKind::parse(&value)
    }
}

impl From<ActionKind> for String {
    fn from(value: ActionKind) -> Self {
        value.as_str().to_string()
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What kind of post-execution check applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum VerificationKind {
    DomChange,
    Navigation,
    StyleChange,
    #[default]
    None,
}

/// Declared verification condition of an action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationSpec {
    #[serde(rename = "type", alias = "kind", default)]
    pub kind: VerificationKind,
    #[serde(default)]
    pub expected_result: String,
}

impl VerificationSpec {
    pub fn none() -> Self {
        Self {
            kind: VerificationKind::None,
            expected_result: String::new(),
        }
    }
}

/// A structured action produced by the action generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedAction {
    #[serde(rename = "type")]
    pub kind: ActionKind,
    /// Snapshot element id, CSS selector, or element text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    /// Kind-specific payload: fill value, URL, scroll spec, style preset or CSS.
    #[serde(default)]
    pub payload: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification: Option<VerificationSpec>,
}

impl GeneratedAction {
    pub fn new(kind: ActionKind) -> Self {
        Self {
            kind,
            target: None,
            payload: String::new(),
            description: String::new(),
            verification: None,
        }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn with_payload(mut self, payload: impl Into<String>) -> Self {
        self.payload = payload.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_verification(mut self, verification: VerificationSpec) -> Self {
        self.verification = Some(verification);
        self
    }

    /// Everything of this action that ends up executed on the page.
    pub fn executable_text(&self) -> String {
        match &self.target {
            Some(target) => format!("{}\n{}", target, self.payload),
            None => self.payload.clone(),
        }
    }
}

/// Result of applying one action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub requires_retry: bool,
}

impl ExecutionOutcome {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            error: None,
            requires_retry: false,
        }
    }

    /// A failure that a regenerated action will not fix.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            message: None,
            error: Some(error.into()),
            requires_retry: false,
        }
    }

    /// A failure worth regenerating against a fresh snapshot.
    pub fn retryable(error: impl Into<String>) -> Self {
        Self {
            requires_retry: true,
            ..Self::failure(error)
        }
    }
}

/// Result of a post-execution check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationOutcome {
    pub success: bool,
    pub expected: String,
    pub observed: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Deterministic actions handled without any model call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FastPathAction {
    Scroll,
    Back,
    Forward,
    Reload,
    Navigate,
    ClickByText,
}

impl FastPathAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            FastPathAction::Scroll => "scroll",
            FastPathAction::Back => "back",
            FastPathAction::Forward => "forward",
            FastPathAction::Reload => "reload",
            FastPathAction::Navigate => "navigate",
            FastPathAction::ClickByText => "clickByText",
        }
    }
}

/// Output of the pattern matcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct FastPathMatch {
    pub matched: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<FastPathAction>,
    #[serde(default)]
    pub params: HashMap<String, String>,
}

impl FastPathMatch {
    pub fn no_match() -> Self {
        Self::default()
    }

    pub fn matched(action: FastPathAction, params: HashMap<String, String>) -> Self {
        Self {
            matched: true,
            action: Some(action),
            params,
        }
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }
}

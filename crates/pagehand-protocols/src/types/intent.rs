//! Intent resolution results.

use serde::{Deserialize, Serialize};

use super::ActionKind;

/// The action a clear command asks for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedIntent {
    pub action: ActionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl ParsedIntent {
    pub fn new(action: ActionKind) -> Self {
        Self {
            action,
            target: None,
            value: None,
        }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }
}

/// Whether a command can proceed, or what to ask the user first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum IntentDecision {
    Clear {
        intent: ParsedIntent,
    },
    #[serde(rename_all = "camelCase")]
    Unclear {
        question: String,
        options: Vec<String>,
        /// Action kind the model leaned towards, if it said.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        suggested_action: Option<ActionKind>,
    },
}

impl IntentDecision {
    pub fn is_clear(&self) -> bool {
        matches!(self, IntentDecision::Clear { .. })
    }
}

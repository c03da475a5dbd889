//! Safety gate verdicts.

use serde::{Deserialize, Serialize};

/// Outcome of inspecting an action before execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "camelCase")]
pub enum SafetyVerdict {
    /// Nothing matched.
    Safe,
    /// Advisory rules matched; execution needs user confirmation.
    #[serde(rename_all = "camelCase")]
    Flagged {
        confirmation_message: String,
        flags: Vec<String>,
    },
    /// A blocking rule matched; the action is discarded.
    #[serde(rename_all = "camelCase")]
    Blocked {
        blocked_fragment: String,
        blocked_reason: String,
    },
}

impl SafetyVerdict {
    /// Whether the action may run at all (possibly after confirmation).
    pub fn is_safe(&self) -> bool {
        !matches!(self, SafetyVerdict::Blocked { .. })
    }

    pub fn needs_confirmation(&self) -> bool {
        matches!(self, SafetyVerdict::Flagged { .. })
    }
}

/// Result of checking element references against a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectorValidation {
    pub valid: bool,
    pub invalid_selectors: Vec<String>,
}

//! Action generation from a clear intent.

use std::fmt::Write;
use std::sync::Arc;

use pagehand_protocols::{
    ActionKind, ChatMessage, GeneratedAction, PageSnapshot, ParsedIntent, VerificationSpec,
};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::PipelineError;
use crate::gateway::{ModelConfig, ModelGateway};
use crate::json_block::extract_json_object;
use crate::retry::RetryContext;

/// Elements rendered into the generation prompt.
const MAX_PROMPT_ELEMENTS: usize = 50;

/// Conversation turns included in the prompt.
pub const CONVERSATION_WINDOW: usize = 5;

const SYSTEM_PROMPT: &str = r#"You turn a user's command into concrete actions on the current web page.

Available action types:
- click: target = element id (e.g. "el_3"), CSS selector, or visible text
- fill: target = input element; payload = the text to enter
- scroll: payload = "up", "down", "left", "right", "top" or "bottom", optionally "down:800"
- navigate: payload = URL
- extract: target = element to read, or null for the whole page
- modify: payload = "largerText", "boldText", "highContrast", or CSS

Prefer element ids from the list. Never write JavaScript.
Each action carries a verification: {"type": "domChange|navigation|styleChange|none", "expectedResult": "<what should be true afterwards>"}.

Respond with a single JSON object and nothing else:
{"success": true, "actions": [{"type": "click", "target": "el_3", "payload": "", "description": "Click the Sign In button", "verification": {"type": "domChange", "expectedResult": "login form shown"}}], "explanation": "<one sentence>"}
If the command cannot be done on this page, respond {"success": false, "actions": [], "explanation": "<why>"}."#;

/// Outcome of one generation call.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeGenResult {
    /// True only if at least one valid action survived.
    pub success: bool,
    pub actions: Vec<GeneratedAction>,
    pub explanation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CodeGenResult {
    fn failed(explanation: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            actions: Vec::new(),
            explanation: explanation.into(),
            error: Some(error.into()),
        }
    }
}

/// Inputs to one generation call.
pub struct GenerationRequest<'a> {
    pub command: &'a str,
    pub intent: &'a ParsedIntent,
    pub snapshot: &'a PageSnapshot,
    /// Recent conversation, oldest first.
    pub conversation: &'a [ChatMessage],
    pub retry: Option<&'a RetryContext>,
}

/// Produces structured actions with the codegen model.
pub struct ActionGenerator {
    gateway: Arc<ModelGateway>,
}

impl ActionGenerator {
    pub fn new(gateway: Arc<ModelGateway>) -> Self {
        Self { gateway }
    }

    /// Generate actions for `request`.
    ///
    /// Gateway failures propagate; a malformed answer is reported through
    /// [`CodeGenResult::success`] instead.
    pub async fn generate(
        &self,
        request: &GenerationRequest<'_>,
        model: &ModelConfig,
    ) -> Result<CodeGenResult, PipelineError> {
        let prompt = build_prompt(request);
        let text = self.gateway.complete(model, SYSTEM_PROMPT, &prompt).await?;
        let result = parse_result(&text);
        debug!(
            "Generated {} action(s), success={}",
            result.actions.len(),
            result.success
        );
        Ok(result)
    }
}

fn build_prompt(request: &GenerationRequest<'_>) -> String {
    let snapshot = request.snapshot;
    let mut prompt = String::new();

    let _ = writeln!(prompt, "Page: {} ({})", snapshot.title, snapshot.url);
    let _ = writeln!(prompt, "\nElements:");
    for element in snapshot.elements.iter().take(MAX_PROMPT_ELEMENTS) {
        let attrs = element
            .attributes
            .pairs()
            .into_iter()
            .map(|(k, v)| format!(" {}=\"{}\"", k, v))
            .collect::<String>();
        let bb = &element.bounding_box;
        let _ = writeln!(
            prompt,
            "[{}] <{}{}> \"{}\" @({:.0},{:.0} {:.0}x{:.0})",
            element.id, element.tag, attrs, element.text, bb.x, bb.y, bb.width, bb.height
        );
    }
    if snapshot.elements.len() > MAX_PROMPT_ELEMENTS {
        let _ = writeln!(
            prompt,
            "... {} more elements not shown",
            snapshot.elements.len() - MAX_PROMPT_ELEMENTS
        );
    }

    if !snapshot.content_summary.is_empty() {
        let _ = writeln!(prompt, "\nPage text (excerpt):\n{}", snapshot.content_summary);
    }

    let start = request.conversation.len().saturating_sub(CONVERSATION_WINDOW);
    let recent = &request.conversation[start..];
    if !recent.is_empty() {
        let _ = writeln!(prompt, "\nRecent conversation:");
        for message in recent {
            let _ = writeln!(prompt, "{}: {}", message.role.as_str(), message.content);
        }
    }

    let intent = request.intent;
    let _ = writeln!(prompt, "\nCommand: {}", request.command.trim());
    let _ = writeln!(
        prompt,
        "Intent: action={}, target={}, value={}",
        intent.action,
        intent.target.as_deref().unwrap_or("-"),
        intent.value.as_deref().unwrap_or("-")
    );

    if let Some(retry) = request.retry.filter(|r| r.is_retry()) {
        let _ = writeln!(
            prompt,
            "\nThis is attempt {} of {}. Previous attempts failed:",
            retry.attempt, retry.max_attempts
        );
        for error in &retry.prior_errors {
            let _ = writeln!(prompt, "- {}", error);
        }
        if let Some(action) = &retry.original_action {
            if let Ok(json) = serde_json::to_string(action) {
                let _ = writeln!(prompt, "Original action: {}", json);
            }
        }
        if !retry.alternative_selectors.is_empty() {
            let _ = writeln!(
                prompt,
                "Elements that may be the intended target: {}",
                retry.alternative_selectors.join(", ")
            );
        }
        let _ = writeln!(prompt, "Use a different target or approach.");
    }

    prompt
}

fn string_field(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match obj.get(*key)? {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    })
}

/// Turn one JSON action into a [`GeneratedAction`], or `None` without a kind.
fn parse_action(value: &Value) -> Option<GeneratedAction> {
    let obj = value.as_object()?;
    let kind = string_field(obj, &["type", "action", "kind"]).filter(|k| !k.trim().is_empty())?;

    let verification = obj
        .get("verification")
        .and_then(|v| serde_json::from_value::<VerificationSpec>(v.clone()).ok());

    Some(GeneratedAction {
        kind: ActionKind::parse(&kind),
        target: string_field(obj, &["target", "selector"]).filter(|t| !t.trim().is_empty()),
        payload: string_field(obj, &["payload", "value", "url", "code"]).unwrap_or_default(),
        description: string_field(obj, &["description"]).unwrap_or_default(),
        verification,
    })
}

pub(crate) fn parse_result(text: &str) -> CodeGenResult {
    let Some(value) = extract_json_object(text) else {
        warn!("Codegen response had no JSON object: {:.200}", text);
        return CodeGenResult::failed(
            "The model did not return any actions.",
            "no structured block in response",
        );
    };

    let explanation = value
        .get("explanation")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let model_success = value.get("success").and_then(Value::as_bool).unwrap_or(true);

    let Some(raw_actions) = value.get("actions").and_then(Value::as_array) else {
        return CodeGenResult::failed(explanation, "response has no actions array");
    };

    let mut actions = Vec::with_capacity(raw_actions.len());
    for (index, raw) in raw_actions.iter().enumerate() {
        match parse_action(raw) {
            Some(action) => actions.push(action),
            None => warn!("Dropping generated action {} without a type: {}", index, raw),
        }
    }

    if !model_success || actions.is_empty() {
        let error = if model_success {
            "no valid actions"
        } else {
            "model reported failure"
        };
        return CodeGenResult {
            success: false,
            actions,
            explanation,
            error: Some(error.to_string()),
        };
    }

    CodeGenResult {
        success: true,
        actions,
        explanation,
        error: None,
    }
}

#[cfg(test)]
#[path = "codegen_tests.rs"]
mod tests;

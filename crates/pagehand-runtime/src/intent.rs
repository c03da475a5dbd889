//! Intent resolution: is the command clear enough to act on?

use std::fmt::Write;
use std::sync::Arc;

use pagehand_protocols::{ActionKind, IntentDecision, PageSnapshot, ParsedIntent};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::PipelineError;
use crate::gateway::{ModelConfig, ModelGateway};
use crate::json_block::extract_json_object;

/// Upper bound on elements listed in the intent prompt.
const MAX_PROMPT_ELEMENTS: usize = 60;

const SYSTEM_PROMPT: &str = r#"You help a user control a web page with natural-language commands.
Decide whether the command can be carried out on the page below without asking the user anything.

A command is unclear only when it could refer to several different elements with different effects
(for example two different "Submit" buttons), or when essential information is missing.
Prefer acting over asking.

Respond with a single JSON object and nothing else.
If the command is clear:
{"clear": true, "parsedIntent": {"action": "click|fill|scroll|navigate|extract|modify", "target": "<element description or null>", "value": "<value or null>"}}
If the command is unclear:
{"clear": false, "question": "<short question for the user>", "options": ["<option 1>", "<option 2>"], "action": "<likely action>"}"#;

/// Decides whether a command needs clarification.
pub struct IntentResolver {
    gateway: Arc<ModelGateway>,
}

impl IntentResolver {
    pub fn new(gateway: Arc<ModelGateway>) -> Self {
        Self { gateway }
    }

    /// Ask the intent model about `command` on the page in `snapshot`.
    ///
    /// Gateway failures propagate; an unparseable answer does not and falls
    /// back to a clear click on the command text.
    pub async fn resolve(
        &self,
        command: &str,
        snapshot: &PageSnapshot,
        model: &ModelConfig,
    ) -> Result<IntentDecision, PipelineError> {
        let prompt = build_prompt(command, snapshot);
        let text = self.gateway.complete(model, SYSTEM_PROMPT, &prompt).await?;

        let decision = parse_decision(&text).unwrap_or_else(|| {
            warn!("Could not parse intent response, proceeding as clear: {:.200}", text);
            fallback(command)
        });
        debug!("Intent decision: clear={}", decision.is_clear());
        Ok(decision)
    }
}

/// The decision used whenever the model's answer is unusable.
pub fn fallback(command: &str) -> IntentDecision {
    IntentDecision::Clear {
        intent: ParsedIntent::new(ActionKind::Click).with_target(command.trim()),
    }
}

fn build_prompt(command: &str, snapshot: &PageSnapshot) -> String {
    let mut prompt = String::new();
    let _ = writeln!(prompt, "Page: {} ({})", snapshot.title, snapshot.url);
    let _ = writeln!(prompt, "\nInteractive elements:");

    let mut listed = 0;
    for element in snapshot.interactive_elements().take(MAX_PROMPT_ELEMENTS) {
        let role = element.role.as_deref().map(|r| format!(" role={}", r)).unwrap_or_default();
        let _ = writeln!(
            prompt,
            "[{}] <{}{}> \"{}\"",
            element.id,
            element.tag,
            role,
            element.label()
        );
        listed += 1;
    }
    if listed == 0 {
        let _ = writeln!(prompt, "(none)");
    }

    let _ = writeln!(prompt, "\nCommand: {}", command.trim());
    prompt
}

fn non_empty_str(value: &Value) -> Option<String> {
    value
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("null"))
        .map(String::from)
}

/// Parse a model answer; `None` means the answer is unusable.
pub(crate) fn parse_decision(text: &str) -> Option<IntentDecision> {
    let value = extract_json_object(text)?;
    let clear = value.get("clear")?.as_bool()?;

    if clear {
        let parsed = value.get("parsedIntent").or_else(|| value.get("parsed_intent"))?;
        let action = parsed.get("action").and_then(Value::as_str)?;
        return Some(IntentDecision::Clear {
            intent: ParsedIntent {
                action: ActionKind::parse(action),
                target: parsed.get("target").and_then(non_empty_str),
                value: parsed.get("value").and_then(non_empty_str),
            },
        });
    }

    let question = value.get("question").and_then(non_empty_str)?;
    let options = value
        .get("options")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(non_empty_str).collect())
        .unwrap_or_default();
    let suggested_action = value
        .get("action")
        .and_then(non_empty_str)
        .map(|a| ActionKind::parse(&a));

    Some(IntentDecision::Unclear {
        question,
        options,
        suggested_action,
    })
}

#[cfg(test)]
#[path = "intent_tests.rs"]
mod tests;

//! Static inspection of generated actions before they run.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use pagehand_protocols::{ActionKind, GeneratedAction, SafetyVerdict, SelectorValidation};
use regex::Regex;
use tracing::warn;

/// A rule that rejects an action outright.
struct BlockRule {
    pattern: Regex,
    reason: &'static str,
}

/// An advisory rule that asks the user to confirm.
struct FlagRule {
    pattern: Regex,
    description: &'static str,
}

fn block(pattern: &str, reason: &'static str) -> BlockRule {
    BlockRule {
        pattern: Regex::new(pattern).expect("valid block pattern"),
        reason,
    }
}

fn flag(pattern: &str, description: &'static str) -> FlagRule {
    FlagRule {
        pattern: Regex::new(pattern).expect("valid flag pattern"),
        description,
    }
}

/// Evaluated in order; the first match is terminal.
static BLOCK_RULES: Lazy<Vec<BlockRule>> = Lazy::new(|| {
    vec![
        block(r"(?i)fetch\s*\(", "Network requests are not allowed"),
        block(r"(?i)XMLHttpRequest", "Network requests are not allowed"),
        block(
            r"(?i)\bWebSocket\b|sendBeacon|\bEventSource\b",
            "Network connections are not allowed",
        ),
        block(r"(?i)document\s*\.\s*cookie", "Cookie access is not allowed"),
        block(
            r"(?i)\b(?:localStorage|sessionStorage|indexedDB)\b",
            "Storage access is not allowed",
        ),
        block(r"(?i)eval\s*\(", "Dynamic code execution is not allowed"),
        block(r"Function\s*\(", "Dynamic code execution is not allowed"),
        block(
            r#"(?i)\bset(?:Timeout|Interval)\s*\(\s*["'`]"#,
            "Dynamic code execution is not allowed",
        ),
        block(r"(?i)<\s*script", "Script injection is not allowed"),
        block(r"(?i)javascript\s*:", "JavaScript URLs are not allowed"),
        block(
            r"\bchrome\s*\.\s*[a-z]\w*|\bbrowser\s*\.\s*runtime",
            "Extension API access is not allowed",
        ),
        block(r"(?i)import\s*\(", "Dynamic imports are not allowed"),
        block(r"(?i)document\s*\.\s*write", "Writing to the document is not allowed"),
    ]
});

/// Navigation targets other than web pages.
static NON_WEB_SCHEME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*(?:data|file|blob|vbscript)\s*:").expect("valid regex"));

/// Evaluated exhaustively; all matches are reported together.
static FLAG_RULES: Lazy<Vec<FlagRule>> = Lazy::new(|| {
    vec![
        flag(
            r"(?i)\b(?:buy|purchase|checkout|check\s+out|pay|payment|place\s+order|order\s+now|subscribe)\b",
            "payment or purchase",
        ),
        flag(
            r"(?i)\b(?:delete|remove|cancel|unsubscribe|deactivate|close\s+account|discard|erase)\b",
            "deletion or cancellation",
        ),
        flag(
            r"(?i)\b(?:password|passcode|credit\s+card|card\s+number|cvv|cvc|ssn|social\s+security|bank\s+account|routing\s+number)\b",
            "sensitive data",
        ),
        flag(
            r#"(?i)\bsubmit\b|\.submit\s*\(|type\s*=\s*["']?submit"#,
            "form submission",
        ),
    ]
});

static ELEMENT_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bel_\d+\b").expect("valid regex"));

/// Stateless gate over the block and flag tables.
#[derive(Debug, Default, Clone, Copy)]
pub struct SafetyGate;

impl SafetyGate {
    pub fn new() -> Self {
        Self
    }

    /// Inspect an action payload.
    pub fn check(&self, payload: &str, kind: &ActionKind) -> SafetyVerdict {
        if let Some(verdict) = self.blocked(payload, kind) {
            return verdict;
        }
        self.flagged(payload)
    }

    /// Inspect everything an action would run, plus its description for flags.
    pub fn check_action(&self, action: &GeneratedAction) -> SafetyVerdict {
        let executable = action.executable_text();
        if let Some(verdict) = self.blocked(&executable, &action.kind) {
            return verdict;
        }
        self.flagged(&format!("{}\n{}", executable, action.description))
    }

    fn blocked(&self, payload: &str, kind: &ActionKind) -> Option<SafetyVerdict> {
        if let Some((rule, m)) = BLOCK_RULES
            .iter()
            .find_map(|rule| rule.pattern.find(payload).map(|m| (rule, m)))
        {
            warn!("Safety gate blocked action: {} ({:?})", rule.reason, m.as_str());
            return Some(SafetyVerdict::Blocked {
                blocked_fragment: m.as_str().to_string(),
                blocked_reason: rule.reason.to_string(),
            });
        }

        if *kind == ActionKind::Navigate {
            if let Some(m) = NON_WEB_SCHEME.find(payload) {
                warn!("Safety gate blocked navigation to {:?}", m.as_str());
                return Some(SafetyVerdict::Blocked {
                    blocked_fragment: m.as_str().trim().to_string(),
                    blocked_reason: "Only web pages can be opened".to_string(),
                });
            }
        }

        None
    }

    fn flagged(&self, text: &str) -> SafetyVerdict {
        let flags: Vec<String> = FLAG_RULES
            .iter()
            .filter(|rule| rule.pattern.is_match(text))
            .map(|rule| rule.description.to_string())
            .collect();

        if flags.is_empty() {
            return SafetyVerdict::Safe;
        }

        SafetyVerdict::Flagged {
            confirmation_message: format!(
                "This action involves {}. Do you want to proceed?",
                flags.join(" and ")
            ),
            flags,
        }
    }

    /// Check that every snapshot element id referenced in `payload` is known.
    pub fn validate_selectors(payload: &str, known_ids: &HashSet<String>) -> SelectorValidation {
        let mut invalid_selectors: Vec<String> = Vec::new();
        for m in ELEMENT_ID.find_iter(payload) {
            let id = m.as_str();
            if !known_ids.contains(id) && !invalid_selectors.iter().any(|s| s == id) {
                invalid_selectors.push(id.to_string());
            }
        }
        SelectorValidation {
            valid: invalid_selectors.is_empty(),
            invalid_selectors,
        }
    }

    /// Strip recognised dangerous fragments. Not a substitute for [`check`](Self::check).
    pub fn sanitize(payload: &str) -> String {
        BLOCK_RULES
            .iter()
            .fold(payload.to_string(), |acc, rule| {
                rule.pattern.replace_all(&acc, "").into_owned()
            })
    }
}

#[cfg(test)]
#[path = "safety_tests.rs"]
mod tests;

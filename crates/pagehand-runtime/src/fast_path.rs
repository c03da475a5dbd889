//! Deterministic pattern matching for trivial commands.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use pagehand_protocols::{FastPathAction, FastPathMatch};
use regex::{Captures, Regex};

/// Scroll distance in pixels when a command gives none.
pub const DEFAULT_SCROLL_AMOUNT: u32 = 400;

/// How a rule turns its captures into parameters.
#[derive(Debug, Clone, Copy)]
enum Params {
    None,
    /// Absolute scroll to `top` or `bottom`.
    Position(&'static str),
    /// Page-sized scroll; capture 1 is the direction.
    Page,
    /// Capture 1 is the direction, optional capture 2 the amount.
    Directional,
    /// Capture 1 is a URL or hostname.
    Url,
    /// Capture 1 is the quoted element text.
    Text,
}

struct Rule {
    pattern: Regex,
    action: FastPathAction,
    params: Params,
}

fn rule(pattern: &str, action: FastPathAction, params: Params) -> Rule {
    Rule {
        pattern: Regex::new(&format!("(?i)^(?:{})$", pattern)).expect("valid fast-path pattern"),
        action,
        params,
    }
}

const NAV_VERB: &str = r"(?:go\s+to|open|navigate\s+to|visit|load)";

/// Ordered rule table; more specific patterns first, first match wins.
static RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    vec![
        rule(
            r"(?:scroll|go|jump)\s+(?:up\s+)?to\s+(?:the\s+)?top(?:\s+of\s+(?:the\s+)?page)?",
            FastPathAction::Scroll,
            Params::Position("top"),
        ),
        rule(
            r"(?:scroll|go|jump)\s+(?:down\s+)?to\s+(?:the\s+)?(?:bottom|end)(?:\s+of\s+(?:the\s+)?page)?",
            FastPathAction::Scroll,
            Params::Position("bottom"),
        ),
        rule(r"(?:scroll\s+)?(?:one\s+)?page\s+(up|down)", FastPathAction::Scroll, Params::Page),
        rule(
            r"scroll\s+(up|down|left|right)(?:\s+(?:by\s+)?(\d+)\s*(?:px|pixels)?)?",
            FastPathAction::Scroll,
            Params::Directional,
        ),
        rule(r"(?:go\s+)?back", FastPathAction::Back, Params::None),
        rule(r"(?:go\s+)?forward", FastPathAction::Forward, Params::None),
        rule(r"(?:reload|refresh)(?:\s+(?:the\s+)?page)?", FastPathAction::Reload, Params::None),
        rule(
            &format!(r"{}\s+(https?://\S+)", NAV_VERB),
            FastPathAction::Navigate,
            Params::Url,
        ),
        rule(
            &format!(
                r"{}\s+((?:www\.)?[a-z0-9][a-z0-9-]*(?:\.[a-z0-9][a-z0-9-]*)*\.[a-z]{{2,}}(?:/\S*)?)",
                NAV_VERB
            ),
            FastPathAction::Navigate,
            Params::Url,
        ),
        rule(
            r#"(?:click|press|tap)\s+(?:on\s+)?(?:the\s+)?["“']([^"”']+)["”'](?:\s+(?:button|link))?"#,
            FastPathAction::ClickByText,
            Params::Text,
        ),
    ]
});

/// Stateless matcher over the rule table.
#[derive(Debug, Default, Clone, Copy)]
pub struct FastPathMatcher;

impl FastPathMatcher {
    pub fn new() -> Self {
        Self
    }

    /// Match a raw command against the rule table.
    pub fn match_command(&self, command: &str) -> FastPathMatch {
        let normalized = command
            .trim()
            .trim_end_matches(|c: char| matches!(c, '.' | '!'))
            .trim();
        if normalized.is_empty() {
            return FastPathMatch::no_match();
        }

        RULES
            .iter()
            .find_map(|rule| {
                rule.pattern
                    .captures(normalized)
                    .map(|caps| FastPathMatch::matched(rule.action, extract(rule.params, &caps)))
            })
            .unwrap_or_else(FastPathMatch::no_match)
    }
}

fn extract(params: Params, caps: &Captures<'_>) -> HashMap<String, String> {
    let group = |i: usize| caps.get(i).map(|m| m.as_str().to_string());
    let mut out = HashMap::new();

    match params {
        Params::None => {}
        Params::Position(position) => {
            out.insert("position".to_string(), position.to_string());
        }
        Params::Page => {
            if let Some(direction) = group(1) {
                out.insert("direction".to_string(), direction.to_lowercase());
            }
            out.insert("amount".to_string(), "page".to_string());
        }
        Params::Directional => {
            if let Some(direction) = group(1) {
                out.insert("direction".to_string(), direction.to_lowercase());
            }
            let amount = group(2).unwrap_or_else(|| DEFAULT_SCROLL_AMOUNT.to_string());
            out.insert("amount".to_string(), amount);
        }
        Params::Url => {
            if let Some(url) = group(1) {
                out.insert("url".to_string(), url);
            }
        }
        Params::Text => {
            if let Some(text) = group(1) {
                out.insert("text".to_string(), text.trim().to_string());
            }
        }
    }

    out
}

#[cfg(test)]
#[path = "fast_path_tests.rs"]
mod tests;

//! Retry backoff and the state carried across regenerate cycles.

use std::collections::HashSet;
use std::time::Duration;

use pagehand_protocols::{GeneratedAction, PageSnapshot};
use serde::Serialize;

/// Most alternative element ids offered after a resolution failure.
pub const MAX_ALTERNATIVES: usize = 3;

/// Exponential backoff configuration.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Base delay between retries.
    pub base_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
    /// Exponential backoff multiplier.
    pub backoff_multiplier: f64,
    /// Add jitter to delays.
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// No waiting between attempts.
    pub fn immediate() -> Self {
        Self {
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            backoff_multiplier: 1.0,
            jitter: false,
        }
    }

    /// Calculate delay for a given attempt (0-based).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay = self.base_delay.as_millis() as f64
            * self.backoff_multiplier.powi(attempt as i32);
        let delay = delay.min(self.max_delay.as_millis() as f64);

        let delay_ms = if self.jitter {
            let jitter = rand_jitter(delay * 0.1);
            (delay + jitter).max(0.0) as u64
        } else {
            delay as u64
        };

        Duration::from_millis(delay_ms)
    }
}

/// Simple jitter using system time.
fn rand_jitter(max: f64) -> f64 {
    use std::time::SystemTime;
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    (nanos as f64 / u32::MAX as f64) * max * 2.0 - max
}

/// What one command has tried so far.
///
/// Lives for the duration of one command (across a confirmation pause) and
/// is dropped on its terminal outcome.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryContext {
    /// Generate-and-execute cycles started so far.
    pub attempt: u32,
    pub max_attempts: u32,
    pub prior_errors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_action: Option<GeneratedAction>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub alternative_selectors: Vec<String>,
}

impl RetryContext {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Default::default()
        }
    }

    pub fn has_attempts_remaining(&self) -> bool {
        self.attempt < self.max_attempts
    }

    /// Whether the next generation is a retry.
    pub fn is_retry(&self) -> bool {
        !self.prior_errors.is_empty()
    }

    pub fn record_failure(&mut self, error: impl Into<String>, action: GeneratedAction) {
        self.prior_errors.push(error.into());
        if self.original_action.is_none() {
            self.original_action = Some(action);
        }
    }

    /// Refresh the alternative candidates against a new snapshot.
    pub fn refresh_alternatives(&mut self, snapshot: &PageSnapshot) {
        let target = self
            .original_action
            .as_ref()
            .and_then(|a| a.target.as_deref().filter(|t| !t.is_empty()).or(Some(a.description.as_str())));
        self.alternative_selectors = match target {
            Some(target) => alternative_selectors(target, snapshot, MAX_ALTERNATIVES),
            None => Vec::new(),
        };
    }
}

fn words(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() > 1)
        .map(str::to_lowercase)
        .collect()
}

/// Snapshot element ids whose labels share the most words with `target`.
pub fn alternative_selectors(target: &str, snapshot: &PageSnapshot, limit: usize) -> Vec<String> {
    let wanted = words(target);
    if wanted.is_empty() {
        return Vec::new();
    }

    let mut scored: Vec<(usize, usize, &str)> = snapshot
        .elements
        .iter()
        .enumerate()
        .filter(|(_, e)| e.id != target)
        .filter_map(|(index, element)| {
            let attrs = &element.attributes;
            let haystack = [
                Some(element.text.as_str()),
                attrs.aria_label.as_deref(),
                attrs.placeholder.as_deref(),
                attrs.name.as_deref(),
            ]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ");
            let overlap = words(&haystack).intersection(&wanted).count();
            (overlap > 0).then_some((overlap, index, element.id.as_str()))
        })
        .collect();

    scored.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
    scored
        .into_iter()
        .take(limit)
        .map(|(_, _, id)| id.to_string())
        .collect()
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;

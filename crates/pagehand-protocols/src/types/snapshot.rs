//! Point-in-time page snapshots.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::surface::{BoundingBox, ElementAttributes};

/// Maximum characters of visible text kept per element.
pub const ELEMENT_TEXT_LIMIT: usize = 100;

/// Maximum characters of page text kept in a snapshot summary.
pub const CONTENT_SUMMARY_LIMIT: usize = 2000;

/// One interactive element of a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementDescriptor {
    /// Identifier unique within the owning snapshot only.
    pub id: String,
    pub tag: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Visible text, truncated to [`ELEMENT_TEXT_LIMIT`].
    pub text: String,
    pub attributes: ElementAttributes,
    pub is_interactive: bool,
    pub is_visible: bool,
    pub bounding_box: BoundingBox,
}

impl ElementDescriptor {
    /// Text a user would use to name this element.
    pub fn label(&self) -> &str {
        if !self.text.trim().is_empty() {
            return self.text.trim();
        }
        self.attributes
            .aria_label
            .as_deref()
            .or(self.attributes.placeholder.as_deref())
            .or(self.attributes.value.as_deref())
            .or(self.attributes.title.as_deref())
            .or(self.attributes.name.as_deref())
            .unwrap_or("")
    }
}

/// A simplified capture of a surface's interactive elements and text.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSnapshot {
    pub url: String,
    pub title: String,
    pub captured_at: DateTime<Utc>,
    pub elements: Vec<ElementDescriptor>,
    /// Plain-text summary of main content, truncated to [`CONTENT_SUMMARY_LIMIT`].
    pub content_summary: String,
}

impl PageSnapshot {
    /// Look up an element by its snapshot identifier.
    pub fn element(&self, id: &str) -> Option<&ElementDescriptor> {
        self.elements.iter().find(|e| e.id == id)
    }

    /// The identifier set of this snapshot.
    pub fn element_ids(&self) -> HashSet<String> {
        self.elements.iter().map(|e| e.id.clone()).collect()
    }

    pub fn interactive_elements(&self) -> impl Iterator<Item = &ElementDescriptor> {
        self.elements.iter().filter(|e| e.is_interactive)
    }
}

/// Truncate to at most `limit` characters on a char boundary.
pub fn truncate_chars(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

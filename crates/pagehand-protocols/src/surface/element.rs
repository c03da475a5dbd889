//! Live element and page types reported by a driver.

use serde::{Deserialize, Serialize};

/// Opaque reference to a live element, minted by the driver.
///
/// A handle stays valid for as long as the element is attached to the
/// document; it means nothing to any other surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementHandle(pub u64);

impl std::fmt::Display for ElementHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Viewport dimensions in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280.0,
            height: 720.0,
        }
    }
}

/// Bounding box for an element, relative to the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Whether the box has a non-zero area.
    pub fn has_area(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }

    /// Check if this box intersects with another.
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.x < other.x + other.width
            && self.x + self.width > other.x
            && self.y < other.y + other.height
            && self.y + self.height > other.y
    }

    /// Check if at least part of this box lies inside the viewport.
    pub fn is_visible_in_viewport(&self, viewport: &Viewport) -> bool {
        let vp_box = BoundingBox::new(0.0, 0.0, viewport.width, viewport.height);
        self.intersects(&vp_box)
    }
}

/// The fixed attribute set captured for every element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ElementAttributes {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub r#type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aria_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl ElementAttributes {
    /// Non-empty attributes as `(name, value)` pairs, in a stable order.
    pub fn pairs(&self) -> Vec<(&'static str, &str)> {
        [
            ("id", &self.id),
            ("class", &self.class),
            ("name", &self.name),
            ("type", &self.r#type),
            ("placeholder", &self.placeholder),
            ("aria-label", &self.aria_label),
            ("href", &self.href),
            ("value", &self.value),
            ("title", &self.title),
        ]
        .into_iter()
        .filter_map(|(k, v)| v.as_deref().filter(|s| !s.is_empty()).map(|s| (k, s)))
        .collect()
    }
}

/// An element as reported by the driver, before snapshot filtering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawElement {
    pub handle: ElementHandle,
    pub tag: String,
    #[serde(default)]
    pub role: Option<String>,
    /// Visible text, untruncated.
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub attributes: ElementAttributes,
    /// Clickable or editable (links, buttons, inputs, ARIA widgets, handlers).
    pub interactive: bool,
    /// Not `display:none` / `visibility:hidden`.
    pub visible: bool,
    pub bounding_box: BoundingBox,
}

impl RawElement {
    /// Whether this element accepts typed text.
    pub fn is_text_input(&self) -> bool {
        let tag = self.tag.to_ascii_lowercase();
        if tag == "textarea" {
            return true;
        }
        if tag != "input" {
            return self.role.as_deref() == Some("textbox");
        }
        !matches!(
            self.attributes.r#type.as_deref().map(str::to_ascii_lowercase).as_deref(),
            Some("button" | "submit" | "reset" | "checkbox" | "radio" | "image" | "file" | "hidden")
        )
    }
}

/// Document readiness, as in `document.readyState`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadyState {
    Loading,
    Interactive,
    Complete,
}

/// Top-level information about the page currently on a surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub url: String,
    pub title: String,
    pub ready_state: ReadyState,
    #[serde(default)]
    pub viewport: Viewport,
}

/// Scroll request understood by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "camelCase")]
pub enum ScrollCommand {
    /// Relative scroll in CSS pixels.
    By { dx: f64, dy: f64 },
    Top,
    Bottom,
}

/// Session history navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryStep {
    Back,
    Forward,
    Reload,
}

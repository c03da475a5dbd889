//! Incoming user commands.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of the surface (tab) a command targets.
pub type SurfaceId = String;

/// A natural-language command issued by the user. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Command {
    /// Raw user text.
    pub text: String,

    /// Target surface.
    pub surface_id: SurfaceId,

    /// When the command was issued.
    pub created_at: DateTime<Utc>,
}

impl Command {
    pub fn new(text: impl Into<String>, surface_id: impl Into<SurfaceId>) -> Self {
        Self {
            text: text.into(),
            surface_id: surface_id.into(),
            created_at: Utc::now(),
        }
    }
}

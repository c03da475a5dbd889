//! Page surface (driver) errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error("Surface not found: {0}")]
    NotFound(String),

    #[error("Element no longer attached: {0}")]
    ElementGone(u64),

    #[error("Script error: {0}")]
    Script(String),

    #[error("Driver error: {0}")]
    Driver(String),

    #[error("Timeout after {0} seconds")]
    Timeout(u64),
}

impl SurfaceError {
    /// Whether the failed operation is worth attempting again with a fresh snapshot.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SurfaceError::ElementGone(_) | SurfaceError::Timeout(_) | SurfaceError::Script(_)
        )
    }
}

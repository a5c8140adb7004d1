//! Error types for the fitness_core library.

use crate::SessionStatus;
use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for fitness_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Lifecycle operation not allowed from the current status.
    /// The controller is left untouched.
    #[error("Cannot {action} a session that is {from}")]
    InvalidTransition {
        action: &'static str,
        from: SessionStatus,
    },

    /// Moment capture requested while the session is not active
    #[error("Cannot capture a moment while the session is {status}")]
    InvalidCapture { status: SessionStatus },

    /// Periodic tick could not be set up
    #[error("Timer unavailable: {0}")]
    TimerUnavailable(String),

    /// Route/path error
    #[error("Route error: {0}")]
    Route(String),

    /// Guided exercise player error
    #[error("Player error: {0}")]
    Player(String),

    /// Catalog validation error
    #[error("Catalog validation error: {0}")]
    Catalog(String),

    /// Media collaborator failed to persist a capture
    #[error("Media error: {0}")]
    Media(String),
}

impl Error {
    /// True for the non-fatal, locally recovered rejections
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Error::InvalidTransition { .. } | Error::InvalidCapture { .. }
        )
    }
}

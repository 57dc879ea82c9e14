//! Crate-level error types
//!
//! The messaging core resolves its own failures into boolean results and log
//! output; these types cover the surfaces that do propagate errors:
//! configuration loading, transport internals, and deployment collaborators.

use thiserror::Error;

/// Main error type for edge deployment operations
#[derive(Debug, Error)]
pub enum EdgeError {
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("Messaging error: {0}")]
    Messaging(#[from] crate::messaging::MessagingError),

    #[error("Deployment error: {0}")]
    Deploy(#[from] crate::deploy::DeployError),

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl EdgeError {
    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

/// Result type for edge deployment operations
pub type EdgeResult<T> = Result<T, EdgeError>;

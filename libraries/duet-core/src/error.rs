//! Core error types for Duet

use crate::capability::Format;
use thiserror::Error;

/// Result type alias using `CoreError`
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors raised by capability policy and option validation
#[derive(Error, Debug)]
pub enum CoreError {
    /// A required format is playable by neither backend. Fatal: the
    /// whole system refuses to initialize.
    #[error("required format {format:?} is not playable by any backend")]
    CapabilityGap {
        /// The format that no backend supports
        format: Format,
    },

    /// Malformed caller input
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl CoreError {
    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}

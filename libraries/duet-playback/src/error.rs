//! Error types for session and registry operations

use thiserror::Error;

/// Result type for playback operations
pub type Result<T> = std::result::Result<T, PlaybackError>;

/// Errors returned to the immediate caller
///
/// These are the typed-failure half of the error design: backend
/// failures never surface here (they arrive as events); this enum
/// covers misuse of the registry surface and the disabled-system
/// state.
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// No sound with this ID exists in the registry
    #[error("unknown sound: {0}")]
    UnknownSound(String),

    /// The system failed its capability check and is inert
    #[error("playback system is disabled (required format unsupported)")]
    Disabled,

    /// Malformed position argument
    #[error("invalid position: {0}")]
    InvalidPosition(i64),

    /// Error from the core capability/option layer
    #[error(transparent)]
    Core(#[from] duet_core::CoreError),
}

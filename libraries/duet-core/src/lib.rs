//! Duet Core
//!
//! Shared types, option model, capability policy, and error handling
//! for the Duet playback system.
//!
//! This crate is the leaf of the workspace: it knows nothing about
//! backends or sessions, only about the vocabulary they share:
//! - **Capability Oracle**: which backend, if any, can play a source
//! - **Option model**: session defaults plus per-call overlays
//! - **State types**: load axis, transport axis, backend tag
//!
//! # Example
//!
//! ```rust
//! use duet_core::capability::{BackendSupport, CanPlay, CapabilityOracle, Format};
//! use duet_core::types::{BackendKind, Setup};
//!
//! let native = BackendSupport::unprobed().with(Format::Mp3, true);
//! let plugin = BackendSupport::unprobed().with(Format::Mp4, true);
//! let oracle = CapabilityOracle::new(&Setup::default(), native, plugin).unwrap();
//!
//! assert_eq!(oracle.can_play("song.mp3"), CanPlay::Yes(BackendKind::Native));
//! assert_eq!(oracle.can_play("song.m4a"), CanPlay::Yes(BackendKind::Plugin));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod capability;
pub mod error;
pub mod options;
pub mod types;

// Re-export commonly used types
pub use capability::{BackendSupport, CanPlay, CapabilityOracle, Format, Resolved};
pub use error::{CoreError, Result};
pub use options::{overlay, Loops, PlayOptions, PlayWindow, SoundOptions};
pub use types::{BackendKind, PlayState, ReadyState, Setup};

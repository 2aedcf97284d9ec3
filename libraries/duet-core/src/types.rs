//! Shared state types for playback sessions

use crate::capability::Format;
use crate::options::SoundOptions;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Which engine services a sound
///
/// A backend is chosen per sound when its URL is resolved and stays
/// fixed until the URL changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BackendKind {
    /// Native media element
    Native,

    /// Remote plugin bridge
    Plugin,
}

/// Load-axis state of a sound session
///
/// `Failed` and `Ready` are both re-enterable: a fresh `load()`
/// resets the session to `Loading`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum ReadyState {
    /// Nothing requested yet
    Unloaded = 0,

    /// Load in flight
    Loading = 1,

    /// Load failed
    Failed = 2,

    /// Resource is playable
    Ready = 3,
}

/// Transport-axis state, independent of the load axis
///
/// `paused` is tracked separately on the session and is only
/// meaningful while `Playing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum PlayState {
    /// Not playing (includes finished)
    Stopped = 0,

    /// Playing, possibly paused
    Playing = 1,
}

/// Registry-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Setup {
    /// Break can-play ties toward the plugin backend (default: false)
    pub prefer_plugin: bool,

    /// Device-class override: always pick native when native can play,
    /// regardless of `prefer_plugin` (default: false)
    pub force_native: bool,

    /// Formats the system refuses to start without
    pub required_formats: Vec<Format>,

    /// Interval for the shared position-poll timer (default: 50ms)
    pub poll_interval: Duration,

    /// Session-level option defaults applied to every created sound
    pub default_options: SoundOptions,
}

impl Default for Setup {
    fn default() -> Self {
        Self {
            prefer_plugin: false,
            force_native: false,
            required_formats: Vec::new(),
            poll_interval: Duration::from_millis(50),
            default_options: SoundOptions::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_setup() {
        let setup = Setup::default();
        assert!(!setup.prefer_plugin);
        assert!(!setup.force_native);
        assert!(setup.required_formats.is_empty());
        assert_eq!(setup.poll_interval, Duration::from_millis(50));
    }

    #[test]
    fn ready_state_discriminants() {
        assert_eq!(ReadyState::Unloaded as u8, 0);
        assert_eq!(ReadyState::Loading as u8, 1);
        assert_eq!(ReadyState::Failed as u8, 2);
        assert_eq!(ReadyState::Ready as u8, 3);
    }
}

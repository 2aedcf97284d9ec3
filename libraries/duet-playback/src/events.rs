//! Normalized playback events
//!
//! Both backends are reconciled into this one event set. Events are
//! queued while a transition runs and drained by the host afterwards,
//! so handlers always observe fully committed session state — a
//! handler may freely call back into the registry.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Events emitted by the playback system
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SoundEvent {
    /// The system passed its capability check and is usable
    SystemReady,

    /// The system failed its capability check; all operations are inert
    SystemTimeout,

    /// A load reached a verdict (success or failure)
    Loaded {
        /// Sound ID
        id: String,
        /// Whether the resource is playable
        success: bool,
    },

    /// Load progress for a sound still transferring
    WhileLoading {
        /// Sound ID
        id: String,
        /// Bytes received so far
        bytes_loaded: u64,
        /// Total bytes, when known
        bytes_total: u64,
        /// Duration estimate in ms, when known
        duration_ms: Option<u32>,
    },

    /// A play pass started (first notification per instance lifecycle)
    Play {
        /// Sound ID
        id: String,
    },

    /// Playback paused
    Pause {
        /// Sound ID
        id: String,
    },

    /// Playback resumed after a pause that already saw `Play`
    Resume {
        /// Sound ID
        id: String,
    },

    /// Periodic position report while playing
    WhilePlaying {
        /// Sound ID
        id: String,
        /// Current position, ms
        position_ms: u32,
    },

    /// A registered position watch fired
    Position {
        /// Sound ID
        id: String,
        /// The watch target that was crossed, ms
        position_ms: u32,
    },

    /// Playback stopped by request
    Stop {
        /// Sound ID
        id: String,
        /// Position at the moment of the stop, ms
        position_ms: u32,
    },

    /// All instances of the sound finished naturally
    ///
    /// With `multi_shot_events`, fired once per finishing instance
    /// instead.
    Finish {
        /// Sound ID
        id: String,
    },

    /// Load failed; the session moved to `Failed`
    LoadFailed {
        /// Sound ID
        id: String,
        /// Backend error code
        code: u32,
    },

    /// Backend reported a failure outside the load path
    ///
    /// Fired at most once per instance lifecycle.
    Failure {
        /// Sound ID
        id: String,
        /// Backend error code
        code: u32,
    },

    /// Buffering started or ended (deduplicated)
    BufferChange {
        /// Sound ID
        id: String,
        /// Whether the backend is buffering
        buffering: bool,
    },

    /// ID3 metadata arrived from the plugin backend
    Id3 {
        /// Sound ID
        id: String,
        /// Tag key/value pairs
        tags: HashMap<String, String>,
    },

    /// Connection verdict for a connection-oriented stream
    Connected {
        /// Sound ID
        id: String,
        /// Whether the connection succeeded
        success: bool,
    },
}

impl SoundEvent {
    /// Sound ID this event concerns, if any
    pub fn sound_id(&self) -> Option<&str> {
        match self {
            SoundEvent::SystemReady | SoundEvent::SystemTimeout => None,
            SoundEvent::Loaded { id, .. }
            | SoundEvent::WhileLoading { id, .. }
            | SoundEvent::Play { id }
            | SoundEvent::Pause { id }
            | SoundEvent::Resume { id }
            | SoundEvent::WhilePlaying { id, .. }
            | SoundEvent::Position { id, .. }
            | SoundEvent::Stop { id, .. }
            | SoundEvent::Finish { id }
            | SoundEvent::LoadFailed { id, .. }
            | SoundEvent::Failure { id, .. }
            | SoundEvent::BufferChange { id, .. }
            | SoundEvent::Id3 { id, .. }
            | SoundEvent::Connected { id, .. } => Some(id),
        }
    }
}

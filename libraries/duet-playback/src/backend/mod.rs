//! Backend adapters and the host driver seam
//!
//! The two playback engines live outside this library. The host hands
//! in driver objects (a native media element, a plugin command
//! channel); the adapters here translate the session's uniform
//! transport surface onto them and normalize their very different
//! event vocabularies into one [`AdapterEvent`] stream.
//!
//! An adapter owns exactly one media resource or plugin channel and
//! never touches another session's resource. Driver call failures are
//! caught at the adapter boundary and converted to
//! [`AdapterEvent::Error`]; they never propagate to the caller.

mod native;
mod plugin;

pub use native::NativeAdapter;
pub use plugin::PluginAdapter;

use duet_core::{BackendKind, Loops};
use std::collections::HashMap;
use thiserror::Error;

/// Failure reported by a host driver call
#[derive(Debug, Clone, Error)]
#[error("driver error {code}: {message}")]
pub struct DriverError {
    /// Backend-defined error code
    pub code: u32,
    /// Human-readable detail
    pub message: String,
}

impl DriverError {
    /// Create a driver error
    pub fn new(code: u32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Result alias for driver calls
pub type DriverResult = std::result::Result<(), DriverError>;

/// Events a native media element reports
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaElementEvent {
    /// Enough data buffered to begin playback
    CanPlay,

    /// Transfer progress
    Progress {
        /// Bytes received
        bytes_loaded: u64,
        /// Total bytes, 0 when unknown
        bytes_total: u64,
        /// Duration estimate in ms, when available
        duration_ms: Option<u32>,
    },

    /// Playback reached the end of the resource
    Ended,

    /// Element-level error
    Error {
        /// Element error code
        code: u32,
    },

    /// Data starvation started (`true`) or cleared (`false`)
    Stalled(bool),
}

/// Push callbacks arriving from the plugin bridge
#[derive(Debug, Clone, PartialEq)]
pub enum PluginCallback {
    /// Load finished, successfully or not
    Loaded {
        /// Whether the sound is playable
        success: bool,
    },

    /// Fine-grained position report while playing
    WhilePlaying {
        /// Current position, ms
        position_ms: u32,
    },

    /// Transfer progress
    WhileLoading {
        /// Bytes received
        bytes_loaded: u64,
        /// Total bytes
        bytes_total: u64,
        /// Duration estimate in ms, when available
        duration_ms: Option<u32>,
    },

    /// One play pass finished
    Finished,

    /// ID3 metadata parsed from the stream
    Id3 {
        /// Tag key/value pairs
        tags: HashMap<String, String>,
    },

    /// Connection verdict for a connection-oriented stream
    Connected {
        /// Whether the connection succeeded
        success: bool,
    },

    /// Plugin-level failure
    Failure {
        /// Plugin error code
        code: u32,
    },

    /// Buffer state change
    BufferChange {
        /// Whether the plugin is buffering
        buffering: bool,
    },
}

/// Host-implemented driver for a native media element
///
/// One element per sound. Commands apply immediately; asynchronous
/// outcomes are queued and collected via [`MediaElement::take_events`].
pub trait MediaElement {
    /// Point the element at a URL
    fn set_source(&mut self, url: &str);

    /// Begin fetching the current source
    fn begin_load(&mut self) -> DriverResult;

    /// Start or resume playback
    fn play(&mut self) -> DriverResult;

    /// Pause playback, keeping position
    fn pause(&mut self);

    /// Seek to an absolute position
    fn set_current_time(&mut self, position_ms: u32) -> DriverResult;

    /// Current playback position, ms
    fn current_time(&self) -> u32;

    /// Total duration in ms, when known
    fn duration(&self) -> Option<u32>;

    /// Set element volume, `0.0..=1.0`
    fn set_volume(&mut self, volume: f32);

    /// Mute or unmute without touching the volume value
    fn set_muted(&mut self, muted: bool);

    /// Enable or disable the element's (binary) loop flag
    fn set_loop(&mut self, looping: bool);

    /// Detach the current source, aborting any transfer
    fn unload(&mut self);

    /// Release the element entirely
    fn release(&mut self);

    /// Collect events emitted since the last call
    fn take_events(&mut self) -> Vec<MediaElementEvent>;
}

/// Host-implemented command channel to one plugin sound
pub trait PluginChannel {
    /// Register the sound with the plugin
    fn create_sound(&mut self, url: &str);

    /// Begin loading
    fn begin_load(&mut self) -> DriverResult;

    /// Open a connection-oriented stream
    fn connect(&mut self, server_url: &str) -> DriverResult;

    /// Start a play pass
    ///
    /// `loops` of 0 means loop forever.
    fn start(&mut self, position_ms: u32, loops: u32, multi_shot: bool) -> DriverResult;

    /// Toggle between paused and playing
    fn pause_toggle(&mut self);

    /// Stop all passes of this sound
    fn stop(&mut self);

    /// Seek to an absolute position
    fn set_position(&mut self, position_ms: u32) -> DriverResult;

    /// Set volume, 0-100
    fn set_volume(&mut self, volume: u8);

    /// Set pan, -100..=100
    fn set_pan(&mut self, pan: i8);

    /// Abort any transfer and forget the loaded data
    fn unload(&mut self);

    /// Remove the sound from the plugin
    fn destroy_sound(&mut self);

    /// Collect callbacks pushed since the last call
    fn take_callbacks(&mut self) -> Vec<PluginCallback>;
}

/// Factory for per-sound driver objects, injected at registry creation
pub trait DriverFactory {
    /// Provision a fresh native media element
    fn media_element(&mut self) -> Box<dyn MediaElement>;

    /// Provision a fresh plugin channel
    fn plugin_channel(&mut self) -> Box<dyn PluginChannel>;
}

/// The one event set both adapters normalize into
#[derive(Debug, Clone, PartialEq)]
pub enum AdapterEvent {
    /// Resource is playable
    Ready,

    /// Transfer progress
    LoadProgress {
        /// Bytes received
        bytes_loaded: u64,
        /// Total bytes, 0 when unknown
        bytes_total: u64,
        /// Duration estimate in ms, when available
        duration_ms: Option<u32>,
    },

    /// Position report (pushed by the plugin, synthesized by polling
    /// for the native element)
    PositionTick(u32),

    /// One play pass reached its natural end
    Finished,

    /// Backend failure
    Error {
        /// Backend error code
        code: u32,
    },

    /// Buffer state change
    Buffering(bool),

    /// Connection verdict (plugin streams only)
    Connected {
        /// Whether the connection succeeded
        success: bool,
    },

    /// ID3 metadata (plugin only)
    Id3 {
        /// Tag key/value pairs
        tags: HashMap<String, String>,
    },
}

/// What a backend can and cannot express
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendCapabilities {
    /// Honors exact finite loop counts (vs. binary infinite loop)
    pub exact_loop_count: bool,

    /// Supports left/right panning
    pub panning: bool,

    /// Can seek while still streaming
    pub streaming_seek: bool,

    /// Pushes fine-grained position events (no polling needed)
    pub push_position: bool,
}

/// One attached backend, servicing exactly one sound
///
/// Dispatch is a variant match; sessions never inspect backend
/// internals beyond this surface.
pub enum BackendAdapter {
    /// Native media element
    Native(NativeAdapter),

    /// Remote plugin channel
    Plugin(PluginAdapter),
}

impl BackendAdapter {
    /// Wrap a native element
    pub fn native(element: Box<dyn MediaElement>) -> Self {
        BackendAdapter::Native(NativeAdapter::new(element))
    }

    /// Wrap a plugin channel
    pub fn plugin(channel: Box<dyn PluginChannel>) -> Self {
        BackendAdapter::Plugin(PluginAdapter::new(channel))
    }

    /// Which engine this is
    pub fn kind(&self) -> BackendKind {
        match self {
            BackendAdapter::Native(_) => BackendKind::Native,
            BackendAdapter::Plugin(_) => BackendKind::Plugin,
        }
    }

    /// Capability set of the underlying engine
    pub fn capabilities(&self) -> BackendCapabilities {
        match self {
            BackendAdapter::Native(a) => a.capabilities(),
            BackendAdapter::Plugin(a) => a.capabilities(),
        }
    }

    /// Bind a source URL (and optional stream endpoint) to the backend
    pub fn attach_source(&mut self, url: &str, server_url: Option<&str>) {
        match self {
            BackendAdapter::Native(a) => a.attach_source(url),
            BackendAdapter::Plugin(a) => a.attach_source(url, server_url),
        }
    }

    /// Begin loading the attached source
    pub fn load(&mut self) {
        match self {
            BackendAdapter::Native(a) => a.load(),
            BackendAdapter::Plugin(a) => a.load(),
        }
    }

    /// Start a play pass from a position
    pub fn play(&mut self, position_ms: u32, loops: Loops, multi_shot: bool) {
        match self {
            BackendAdapter::Native(a) => a.play(position_ms, loops),
            BackendAdapter::Plugin(a) => a.play(position_ms, loops, multi_shot),
        }
    }

    /// Pause, keeping position
    pub fn pause(&mut self) {
        match self {
            BackendAdapter::Native(a) => a.pause(),
            BackendAdapter::Plugin(a) => a.pause(),
        }
    }

    /// Resume from pause
    pub fn resume(&mut self) {
        match self {
            BackendAdapter::Native(a) => a.resume(),
            BackendAdapter::Plugin(a) => a.resume(),
        }
    }

    /// Stop playback and rewind
    pub fn stop(&mut self) {
        match self {
            BackendAdapter::Native(a) => a.stop(),
            BackendAdapter::Plugin(a) => a.stop(),
        }
    }

    /// Seek to an absolute position
    pub fn seek(&mut self, position_ms: u32) {
        match self {
            BackendAdapter::Native(a) => a.seek(position_ms),
            BackendAdapter::Plugin(a) => a.seek(position_ms),
        }
    }

    /// Apply an effective volume (mute already folded in by the caller)
    pub fn set_volume(&mut self, volume: u8) {
        match self {
            BackendAdapter::Native(a) => a.set_volume(volume),
            BackendAdapter::Plugin(a) => a.set_volume(volume),
        }
    }

    /// Apply pan; the native element cannot pan and no-ops
    pub fn set_pan(&mut self, pan: i8) {
        match self {
            BackendAdapter::Native(a) => a.set_pan(pan),
            BackendAdapter::Plugin(a) => a.set_pan(pan),
        }
    }

    /// Mute or unmute without discarding the stored volume
    ///
    /// `restore_volume` is applied when unmuting on backends that mute
    /// by zeroing volume.
    pub fn apply_mute(&mut self, muted: bool, restore_volume: u8) {
        match self {
            BackendAdapter::Native(a) => a.apply_mute(muted),
            BackendAdapter::Plugin(a) => a.apply_mute(muted, restore_volume),
        }
    }

    /// Abort transfers and forget loaded data, keeping the resource
    pub fn unload(&mut self) {
        match self {
            BackendAdapter::Native(a) => a.unload(),
            BackendAdapter::Plugin(a) => a.unload(),
        }
    }

    /// Tear the backend resource down entirely
    pub fn destroy(&mut self) {
        match self {
            BackendAdapter::Native(a) => a.destroy(),
            BackendAdapter::Plugin(a) => a.destroy(),
        }
    }

    /// Last known playback position, ms
    pub fn position(&self) -> u32 {
        match self {
            BackendAdapter::Native(a) => a.position(),
            BackendAdapter::Plugin(a) => a.position(),
        }
    }

    /// Total duration in ms, when known
    pub fn duration(&self) -> Option<u32> {
        match self {
            BackendAdapter::Native(a) => a.duration(),
            BackendAdapter::Plugin(a) => a.duration(),
        }
    }

    /// Drain normalized events since the last poll
    pub fn poll_events(&mut self) -> Vec<AdapterEvent> {
        match self {
            BackendAdapter::Native(a) => a.poll_events(),
            BackendAdapter::Plugin(a) => a.poll_events(),
        }
    }
}

//! Sound option model and the per-call overlay merge
//!
//! Options are layered: call-level options over session-level options
//! over registry defaults, call-level always winning. The merge is a
//! pure function and never mutates its inputs.

use crate::types::BackendKind;
use serde::{Deserialize, Serialize};

/// Loop behavior for one play pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Loops {
    /// Play the sound this many times (1 = no repeat)
    Count(u32),

    /// Loop forever until stopped
    Infinite,
}

impl Default for Loops {
    fn default() -> Self {
        Loops::Count(1)
    }
}

impl Loops {
    /// Adjust a loop request to what the backend can express
    ///
    /// The native element only offers a binary infinite loop, so a
    /// finite repeat count above 1 degrades to infinite there. The
    /// plugin honors exact counts.
    pub fn for_backend(self, backend: BackendKind) -> Loops {
        match (backend, self) {
            (BackendKind::Native, Loops::Count(n)) if n > 1 => {
                tracing::warn!(
                    requested = n,
                    "native backend cannot loop a finite count; degrading to infinite loop"
                );
                Loops::Infinite
            }
            _ => self,
        }
    }

    /// Whether this pass repeats at all
    pub fn repeats(self) -> bool {
        !matches!(self, Loops::Count(0 | 1))
    }
}

/// From/to playback window (milliseconds)
///
/// Both ends optional; playback windows only apply when both are set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayWindow {
    /// Start position, ms
    pub from: Option<u32>,

    /// Stop position, ms
    pub to: Option<u32>,
}

impl PlayWindow {
    /// Both ends set: the window is in effect
    pub fn is_set(&self) -> bool {
        self.from.is_some() && self.to.is_some()
    }
}

/// Session-level sound options with concrete defaults
///
/// Defaults mirror the documented behavior: sounds do not load or play
/// automatically, play at full volume centered, and layer on top of
/// each other when played while already playing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoundOptions {
    /// Candidate source URLs, first playable wins
    pub url: Vec<String>,

    /// Begin loading at create time
    pub auto_load: bool,

    /// Begin playing as soon as loadable
    pub auto_play: bool,

    /// Loop behavior
    pub loops: Loops,

    /// Volume, 0-100
    pub volume: u8,

    /// Pan, -100 (left) to 100 (right)
    pub pan: i8,

    /// Initial playback offset, ms
    pub position: u32,

    /// Allow overlapping shots of the same sound
    pub multi_shot: bool,

    /// Fire finish events per shot instead of once at zero instances
    pub multi_shot_events: bool,

    /// From/to playback window
    pub window: PlayWindow,

    /// Connection-oriented stream endpoint (plugin backend only)
    pub server_url: Option<String>,

    /// Positions of interest (ms) attached as watches at first play
    pub on_position: Vec<u32>,
}

impl Default for SoundOptions {
    fn default() -> Self {
        Self {
            url: Vec::new(),
            auto_load: false,
            auto_play: false,
            loops: Loops::default(),
            volume: 100,
            pan: 0,
            position: 0,
            multi_shot: true,
            multi_shot_events: false,
            window: PlayWindow::default(),
            server_url: None,
            on_position: Vec::new(),
        }
    }
}

/// Per-call option overlay: every field optional
///
/// Unset fields inherit from the session options underneath.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayOptions {
    /// Replace the candidate URL list for this call
    pub url: Option<Vec<String>>,

    /// Override loop behavior
    pub loops: Option<Loops>,

    /// Override volume
    pub volume: Option<u8>,

    /// Override pan
    pub pan: Option<i8>,

    /// Override start offset, ms
    pub position: Option<u32>,

    /// Override overlap policy
    pub multi_shot: Option<bool>,

    /// Override per-shot event policy
    pub multi_shot_events: Option<bool>,

    /// Override the playback window; unset ends inherit
    pub window: Option<PlayWindow>,
}

impl PlayOptions {
    /// Convenience: overlay carrying only a start position
    pub fn at_position(position: u32) -> Self {
        Self {
            position: Some(position),
            ..Self::default()
        }
    }
}

/// Layer call-level options over session-level options
///
/// Call-level always wins; the window group merges field-wise so a
/// call can override `to` while inheriting `from`.
pub fn overlay(low: &SoundOptions, high: &PlayOptions) -> SoundOptions {
    let mut merged = low.clone();
    if let Some(url) = &high.url {
        merged.url = url.clone();
    }
    if let Some(loops) = high.loops {
        merged.loops = loops;
    }
    if let Some(volume) = high.volume {
        merged.volume = volume.min(100);
    }
    if let Some(pan) = high.pan {
        merged.pan = pan.clamp(-100, 100);
    }
    if let Some(position) = high.position {
        merged.position = position;
    }
    if let Some(multi_shot) = high.multi_shot {
        merged.multi_shot = multi_shot;
    }
    if let Some(multi_shot_events) = high.multi_shot_events {
        merged.multi_shot_events = multi_shot_events;
    }
    if let Some(window) = high.window {
        merged.window = PlayWindow {
            from: window.from.or(low.window.from),
            to: window.to.or(low.window.to),
        };
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let opts = SoundOptions::default();
        assert!(!opts.auto_load);
        assert!(!opts.auto_play);
        assert_eq!(opts.loops, Loops::Count(1));
        assert_eq!(opts.volume, 100);
        assert_eq!(opts.pan, 0);
        assert!(opts.multi_shot);
        assert!(!opts.multi_shot_events);
        assert!(!opts.window.is_set());
    }

    #[test]
    fn overlay_call_level_wins() {
        let session = SoundOptions {
            volume: 40,
            position: 500,
            ..SoundOptions::default()
        };
        let call = PlayOptions {
            volume: Some(90),
            ..PlayOptions::default()
        };
        let merged = overlay(&session, &call);
        assert_eq!(merged.volume, 90);
        // unset call fields inherit
        assert_eq!(merged.position, 500);
    }

    #[test]
    fn overlay_clamps_ranges() {
        let call = PlayOptions {
            volume: Some(200),
            pan: Some(-120),
            ..PlayOptions::default()
        };
        let merged = overlay(&SoundOptions::default(), &call);
        assert_eq!(merged.volume, 100);
        assert_eq!(merged.pan, -100);
    }

    #[test]
    fn overlay_window_merges_per_field() {
        let session = SoundOptions {
            window: PlayWindow {
                from: Some(2000),
                to: None,
            },
            ..SoundOptions::default()
        };
        let call = PlayOptions {
            window: Some(PlayWindow {
                from: None,
                to: Some(5000),
            }),
            ..PlayOptions::default()
        };
        let merged = overlay(&session, &call);
        assert_eq!(merged.window.from, Some(2000));
        assert_eq!(merged.window.to, Some(5000));
        assert!(merged.window.is_set());
    }

    #[test]
    fn overlay_does_not_mutate_inputs() {
        let session = SoundOptions::default();
        let call = PlayOptions {
            volume: Some(10),
            ..PlayOptions::default()
        };
        let _ = overlay(&session, &call);
        assert_eq!(session.volume, 100);
    }

    #[test]
    fn native_loop_degradation() {
        assert_eq!(
            Loops::Count(3).for_backend(BackendKind::Native),
            Loops::Infinite
        );
        assert_eq!(
            Loops::Count(3).for_backend(BackendKind::Plugin),
            Loops::Count(3)
        );
        assert_eq!(
            Loops::Count(1).for_backend(BackendKind::Native),
            Loops::Count(1)
        );
        assert_eq!(
            Loops::Infinite.for_backend(BackendKind::Native),
            Loops::Infinite
        );
    }

    #[test]
    fn loops_repeats() {
        assert!(!Loops::Count(1).repeats());
        assert!(!Loops::Count(0).repeats());
        assert!(Loops::Count(2).repeats());
        assert!(Loops::Infinite.repeats());
    }
}

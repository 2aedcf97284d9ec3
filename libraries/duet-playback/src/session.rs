//! Per-sound session state machine
//!
//! A session owns one backend adapter and tracks the canonical state
//! of one sound: readiness, play state, pause flag, instance count,
//! position, volume and mute. All mutation happens here; events are
//! pushed onto the caller's queue and drained only after the
//! transition has committed, so an event handler always observes
//! settled state.

use crate::backend::{AdapterEvent, BackendAdapter};
use crate::events::SoundEvent;
use crate::watch::{WatchKind, WatchList};
use duet_core::{overlay, PlayOptions, PlayState, ReadyState, SoundOptions};

/// One sound registered with the system
pub struct SoundSession {
    id: String,
    /// Session-level options, the overlay base for every play call
    options: SoundOptions,
    /// Options of the current instance lifecycle (merged at play time)
    instance_options: SoundOptions,
    url: String,
    backend: BackendAdapter,
    ready_state: ReadyState,
    play_state: PlayState,
    paused: bool,
    instance_count: u32,
    position_ms: u32,
    bytes_loaded: u64,
    bytes_total: u64,
    duration_ms: Option<u32>,
    volume: u8,
    pan: i8,
    muted: bool,
    global_muted: bool,
    watches: WatchList,
    /// Play already announced for this instance lifecycle; a resume
    /// after this point reports `Resume` instead of `Play`
    onplay_called: bool,
    buffering: bool,
    /// Play request deferred until the load verdict
    pending_play: Option<PlayOptions>,
    /// Failures reported this instance lifecycle; only the first one
    /// is surfaced
    failures: u32,
}

impl SoundSession {
    /// Create a session around an attached backend
    pub(crate) fn new(
        id: String,
        options: SoundOptions,
        backend: BackendAdapter,
        url: String,
    ) -> Self {
        let volume = options.volume.min(100);
        let pan = options.pan.clamp(-100, 100);
        Self {
            id,
            instance_options: options.clone(),
            options,
            url,
            backend,
            ready_state: ReadyState::Unloaded,
            play_state: PlayState::Stopped,
            paused: false,
            instance_count: 0,
            position_ms: 0,
            bytes_loaded: 0,
            bytes_total: 0,
            duration_ms: None,
            volume,
            pan,
            muted: false,
            global_muted: false,
            watches: WatchList::new(),
            onplay_called: false,
            buffering: false,
            pending_play: None,
            failures: 0,
        }
    }

    fn emit(&self, events: &mut Vec<SoundEvent>, event: SoundEvent) {
        events.push(event);
    }

    fn effective_volume(&self) -> u8 {
        if self.muted || self.global_muted {
            0
        } else {
            self.volume
        }
    }

    fn is_muted(&self) -> bool {
        self.muted || self.global_muted
    }

    /// Begin loading the attached source
    pub fn load(&mut self) {
        match self.ready_state {
            ReadyState::Loading | ReadyState::Ready => {}
            ReadyState::Unloaded | ReadyState::Failed => {
                tracing::debug!(id = %self.id, url = %self.url, "loading");
                self.ready_state = ReadyState::Loading;
                self.instance_count = 0;
                self.watches.reset(0);
                self.backend.load();
            }
        }
    }

    /// Start a play pass, layering call options over session options
    pub fn play(&mut self, opts: &PlayOptions, events: &mut Vec<SoundEvent>) {
        let mut merged = overlay(&self.options, opts);

        // one-shot gate: an active non-overlapping sound ignores play
        if self.play_state == PlayState::Playing && !self.paused && !merged.multi_shot {
            tracing::debug!(id = %self.id, "already playing and multi-shot is off, ignoring");
            return;
        }

        match self.ready_state {
            ReadyState::Unloaded => {
                self.pending_play = Some(opts.clone());
                self.load();
                return;
            }
            ReadyState::Loading => {
                self.pending_play = Some(opts.clone());
                return;
            }
            ReadyState::Failed => {
                tracing::debug!(id = %self.id, "load failed earlier, ignoring play");
                return;
            }
            ReadyState::Ready => {}
        }

        // a paused sound resumes rather than starting another shot,
        // except a connection-oriented stream still sitting at zero
        if self.paused && (self.position_ms > 0 || merged.server_url.is_none()) {
            self.resume(events);
            return;
        }

        let fresh_start = self.instance_count == 0 && self.play_state == PlayState::Stopped;

        // from/to window: seek to the start and arm the stop sentinel
        if merged.window.is_set() && fresh_start && merged.server_url.is_none() {
            if let (Some(from), Some(to)) = (merged.window.from, merged.window.to) {
                merged.position = from;
                merged.multi_shot = false;
                self.watches.attach(to, WatchKind::EndWindow, false);
            }
        }

        if self.instance_count == 0 {
            for target in &merged.on_position {
                if !self.watches.has_options_watch(*target) {
                    self.watches.attach(*target, WatchKind::Notify, true);
                }
            }
        }

        if self.instance_count == 0 || (!self.paused && merged.multi_shot) {
            self.instance_count += 1;
        }

        self.play_state = PlayState::Playing;
        self.paused = false;
        self.position_ms = merged.position;
        self.volume = merged.volume;
        self.pan = merged.pan;

        self.emit(
            events,
            SoundEvent::Play {
                id: self.id.clone(),
            },
        );
        self.onplay_called = true;

        self.backend.set_volume(self.effective_volume());
        self.backend.set_pan(self.pan);
        let loops = merged.loops.for_backend(self.backend.kind());
        self.backend
            .play(merged.position, loops, merged.multi_shot);
        self.instance_options = merged;
    }

    /// Pause, keeping position
    ///
    /// A play still waiting on its load verdict can be paused too:
    /// the deferred shot then stays parked until `resume`.
    pub fn pause(&mut self, events: &mut Vec<SoundEvent>) {
        if self.paused {
            return;
        }
        if self.play_state != PlayState::Playing && self.pending_play.is_none() {
            return;
        }
        self.paused = true;
        if self.play_state == PlayState::Playing {
            self.backend.pause();
        }
        self.emit(
            events,
            SoundEvent::Pause {
                id: self.id.clone(),
            },
        );
    }

    /// Resume from pause
    ///
    /// Announces `Play` if no play has been reported this instance
    /// lifecycle (a sound paused before it ever started), otherwise
    /// `Resume`.
    pub fn resume(&mut self, events: &mut Vec<SoundEvent>) {
        if !self.paused {
            return;
        }
        self.paused = false;
        // still waiting on the load verdict; the start and its
        // announcement come with the verdict
        if self.pending_play.is_some() {
            return;
        }
        self.play_state = PlayState::Playing;
        self.backend.resume();
        if self.onplay_called {
            self.emit(
                events,
                SoundEvent::Resume {
                    id: self.id.clone(),
                },
            );
        } else {
            self.onplay_called = true;
            self.emit(
                events,
                SoundEvent::Play {
                    id: self.id.clone(),
                },
            );
        }
    }

    /// Pause when playing, resume when paused, play when stopped
    pub fn toggle_pause(&mut self, events: &mut Vec<SoundEvent>) {
        if self.play_state == PlayState::Stopped {
            self.play(&PlayOptions::at_position(self.position_ms), events);
        } else if self.paused {
            self.resume(events);
        } else {
            self.pause(events);
        }
    }

    /// Stop all shots of this sound
    ///
    /// The reported position is the position at the moment of the
    /// stop; the backend itself rewinds to zero.
    pub fn stop(&mut self, events: &mut Vec<SoundEvent>) {
        if self.play_state != PlayState::Playing {
            return;
        }
        let stop_position = self.position_ms;
        if self.buffering {
            self.buffering = false;
            self.emit(
                events,
                SoundEvent::BufferChange {
                    id: self.id.clone(),
                    buffering: false,
                },
            );
        }
        self.watches.reset(0);
        self.watches.detach_options();
        self.watches.detach_end_window();
        self.backend.stop();
        self.play_state = PlayState::Stopped;
        self.paused = false;
        self.instance_count = 0;
        self.onplay_called = false;
        self.failures = 0;
        self.instance_options = self.options.clone();
        // keep the pre-stop position observable even though the
        // backend has rewound
        self.position_ms = stop_position;
        self.emit(
            events,
            SoundEvent::Stop {
                id: self.id.clone(),
                position_ms: stop_position,
            },
        );
    }

    /// Seek to an absolute position
    ///
    /// Watches past the old position but at or ahead of the new one
    /// are re-armed.
    pub fn set_position(&mut self, position_ms: u32) {
        self.position_ms = position_ms;
        self.watches.reset(position_ms);
        self.backend.seek(position_ms);
    }

    /// Set volume, 0-100
    ///
    /// The value becomes the session default, so later play passes
    /// inherit it unless the call overrides it.
    pub fn set_volume(&mut self, volume: u8) {
        self.volume = volume.min(100);
        self.options.volume = self.volume;
        self.instance_options.volume = self.volume;
        if !self.is_muted() {
            self.backend.set_volume(self.volume);
        }
    }

    /// Set pan, -100..=100
    ///
    /// Like volume, the value persists across play passes.
    pub fn set_pan(&mut self, pan: i8) {
        self.pan = pan.clamp(-100, 100);
        self.options.pan = self.pan;
        self.instance_options.pan = self.pan;
        self.backend.set_pan(self.pan);
    }

    /// Mute or unmute this sound; the volume value survives the mute
    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
        self.backend.apply_mute(self.is_muted(), self.volume);
    }

    /// Apply or lift the system-wide mute
    ///
    /// A per-sound mute keeps the sound silent after the global mute
    /// lifts.
    pub(crate) fn set_global_muted(&mut self, muted: bool) {
        self.global_muted = muted;
        self.backend.apply_mute(self.is_muted(), self.volume);
    }

    /// Arm a position watch
    pub fn watch_position(&mut self, position_ms: u32) {
        self.watches.attach(position_ms, WatchKind::Notify, false);
    }

    /// Remove position watches; `None` removes every explicitly
    /// attached watch
    pub fn clear_position(&mut self, position_ms: Option<u32>) {
        self.watches.clear(position_ms);
    }

    /// Abort any transfer and return to the unloaded state
    pub fn unload(&mut self, events: &mut Vec<SoundEvent>) {
        self.stop(events);
        self.backend.unload();
        self.ready_state = ReadyState::Unloaded;
        self.play_state = PlayState::Stopped;
        self.paused = false;
        self.bytes_loaded = 0;
        self.bytes_total = 0;
        self.duration_ms = None;
        self.position_ms = 0;
        self.pending_play = None;
    }

    /// Release the backend resource
    pub(crate) fn destroy(&mut self, events: &mut Vec<SoundEvent>) {
        self.stop(events);
        self.backend.destroy();
    }

    /// Sample the backend position and run the periodic bookkeeping
    ///
    /// Called by the shared poll timer for sounds whose backend does
    /// not push position events.
    pub(crate) fn poll(&mut self, events: &mut Vec<SoundEvent>) {
        if self.play_state != PlayState::Playing || self.paused {
            return;
        }
        let position = self.backend.position();
        self.on_position_tick(position, events);
    }

    /// Whether the shared poll timer needs to sample this session
    pub(crate) fn needs_poll(&self) -> bool {
        self.play_state == PlayState::Playing
            && !self.paused
            && !self.backend.capabilities().push_position
    }

    /// Pump backend events through the state machine
    pub(crate) fn pump(&mut self, events: &mut Vec<SoundEvent>) {
        for event in self.backend.poll_events() {
            self.handle_backend_event(event, events);
        }
    }

    fn handle_backend_event(&mut self, event: AdapterEvent, events: &mut Vec<SoundEvent>) {
        match event {
            AdapterEvent::Ready => self.on_ready(events),
            AdapterEvent::LoadProgress {
                bytes_loaded,
                bytes_total,
                duration_ms,
            } => self.on_load_progress(bytes_loaded, bytes_total, duration_ms, events),
            AdapterEvent::PositionTick(position_ms) => self.on_position_tick(position_ms, events),
            AdapterEvent::Finished => self.on_finished(events),
            AdapterEvent::Error { code } => self.on_error(code, events),
            AdapterEvent::Buffering(buffering) => self.on_buffer_change(buffering, events),
            AdapterEvent::Connected { success } => self.on_connected(success, events),
            AdapterEvent::Id3 { tags } => self.emit(
                events,
                SoundEvent::Id3 {
                    id: self.id.clone(),
                    tags,
                },
            ),
        }
    }

    /// Commit a deferred play whose sound was paused before the load
    /// verdict arrived
    ///
    /// The shot's options, watches and instance count are committed,
    /// but the transport is left idle and no play is announced;
    /// `resume` rolls it and reports the first play.
    fn park_deferred(&mut self, opts: &PlayOptions) {
        let merged = overlay(&self.options, opts);
        for target in &merged.on_position {
            if !self.watches.has_options_watch(*target) {
                self.watches.attach(*target, WatchKind::Notify, true);
            }
        }
        self.instance_count = 1;
        self.play_state = PlayState::Playing;
        self.position_ms = merged.position;
        self.volume = merged.volume;
        self.pan = merged.pan;
        self.backend.set_volume(self.effective_volume());
        self.backend.set_pan(self.pan);
        if merged.position > 0 {
            self.backend.seek(merged.position);
        }
        self.instance_options = merged;
    }

    fn on_ready(&mut self, events: &mut Vec<SoundEvent>) {
        // stale verdicts (after unload, or duplicates) change nothing
        if self.ready_state != ReadyState::Loading {
            return;
        }
        self.ready_state = ReadyState::Ready;
        if let Some(duration) = self.backend.duration() {
            self.duration_ms = Some(duration);
        }
        self.emit(
            events,
            SoundEvent::Loaded {
                id: self.id.clone(),
                success: true,
            },
        );
        // replay the play call that was waiting on the load verdict
        if let Some(opts) = self.pending_play.take() {
            if self.paused {
                self.park_deferred(&opts);
            } else {
                self.play(&opts, events);
            }
        }
    }

    /// Connection verdict for a stream sound
    ///
    /// Streams have no load completion of their own; a successful
    /// connection is what makes them playable.
    fn on_connected(&mut self, success: bool, events: &mut Vec<SoundEvent>) {
        self.emit(
            events,
            SoundEvent::Connected {
                id: self.id.clone(),
                success,
            },
        );
        if self.ready_state != ReadyState::Loading {
            return;
        }
        if success {
            self.ready_state = ReadyState::Ready;
            if let Some(opts) = self.pending_play.take() {
                if self.paused {
                    self.park_deferred(&opts);
                } else {
                    self.play(&opts, events);
                }
            }
        } else {
            self.on_error(0, events);
        }
    }

    fn on_load_progress(
        &mut self,
        bytes_loaded: u64,
        bytes_total: u64,
        duration_ms: Option<u32>,
        events: &mut Vec<SoundEvent>,
    ) {
        self.bytes_loaded = bytes_loaded;
        self.bytes_total = bytes_total;
        if self.ready_state == ReadyState::Unloaded || self.ready_state == ReadyState::Failed {
            return;
        }
        if duration_ms.is_some() {
            self.duration_ms = duration_ms;
        }
        self.emit(
            events,
            SoundEvent::WhileLoading {
                id: self.id.clone(),
                bytes_loaded,
                bytes_total,
                duration_ms: self.duration_ms,
            },
        );
    }

    fn on_position_tick(&mut self, position_ms: u32, events: &mut Vec<SoundEvent>) {
        if self.play_state != PlayState::Playing || self.paused {
            return;
        }
        self.position_ms = position_ms;
        self.emit(
            events,
            SoundEvent::WhilePlaying {
                id: self.id.clone(),
                position_ms,
            },
        );
        let mut end_window = false;
        for (target, kind) in self.watches.process(position_ms) {
            match kind {
                WatchKind::Notify => self.emit(
                    events,
                    SoundEvent::Position {
                        id: self.id.clone(),
                        position_ms: target,
                    },
                ),
                WatchKind::EndWindow => end_window = true,
            }
        }
        if end_window {
            self.stop(events);
        }
    }

    fn on_finished(&mut self, events: &mut Vec<SoundEvent>) {
        // a finish racing a stop has nothing left to finish
        if self.play_state != PlayState::Playing {
            return;
        }
        if self.buffering {
            self.buffering = false;
            self.emit(
                events,
                SoundEvent::BufferChange {
                    id: self.id.clone(),
                    buffering: false,
                },
            );
        }
        self.watches.reset(0);
        let per_shot = self.instance_options.multi_shot_events;
        if per_shot && self.instance_count > 0 {
            self.emit(
                events,
                SoundEvent::Finish {
                    id: self.id.clone(),
                },
            );
        }
        self.instance_count = self.instance_count.saturating_sub(1);
        if self.instance_count == 0 {
            self.watches.detach_options();
            self.watches.detach_end_window();
            self.play_state = PlayState::Stopped;
            self.paused = false;
            self.position_ms = 0;
            self.onplay_called = false;
            self.failures = 0;
            self.instance_options = self.options.clone();
            if !per_shot {
                self.emit(
                    events,
                    SoundEvent::Finish {
                        id: self.id.clone(),
                    },
                );
            }
        }
    }

    fn on_error(&mut self, code: u32, events: &mut Vec<SoundEvent>) {
        if self.ready_state == ReadyState::Loading {
            self.ready_state = ReadyState::Failed;
            self.pending_play = None;
            self.play_state = PlayState::Stopped;
            self.paused = false;
            self.instance_count = 0;
            self.emit(
                events,
                SoundEvent::LoadFailed {
                    id: self.id.clone(),
                    code,
                },
            );
            self.emit(
                events,
                SoundEvent::Loaded {
                    id: self.id.clone(),
                    success: false,
                },
            );
            return;
        }
        self.failures += 1;
        if self.failures == 1 {
            self.emit(
                events,
                SoundEvent::Failure {
                    id: self.id.clone(),
                    code,
                },
            );
        } else {
            tracing::debug!(id = %self.id, code, "repeat failure suppressed");
        }
    }

    fn on_buffer_change(&mut self, buffering: bool, events: &mut Vec<SoundEvent>) {
        if self.play_state != PlayState::Playing {
            tracing::debug!(id = %self.id, buffering, "buffer change while not playing, ignored");
            return;
        }
        if buffering == self.buffering {
            return;
        }
        self.buffering = buffering;
        self.emit(
            events,
            SoundEvent::BufferChange {
                id: self.id.clone(),
                buffering,
            },
        );
    }

    /// Sound ID
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Resolved source URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Replace the resolved URL and session options
    ///
    /// Used when a play call redirects the sound at a new source.
    pub(crate) fn rebind(&mut self, url: String, options: SoundOptions, backend: BackendAdapter) {
        self.url = url;
        self.instance_options = options.clone();
        self.options = options;
        self.backend = backend;
        self.ready_state = ReadyState::Unloaded;
        self.play_state = PlayState::Stopped;
        self.paused = false;
        self.instance_count = 0;
        self.position_ms = 0;
        self.bytes_loaded = 0;
        self.bytes_total = 0;
        self.duration_ms = None;
        self.watches = WatchList::new();
        self.onplay_called = false;
        self.buffering = false;
        self.pending_play = None;
        self.failures = 0;
    }

    /// Session-level options
    pub fn options(&self) -> &SoundOptions {
        &self.options
    }

    /// Load lifecycle state
    pub fn ready_state(&self) -> ReadyState {
        self.ready_state
    }

    /// Play lifecycle state
    pub fn play_state(&self) -> PlayState {
        self.play_state
    }

    /// Whether playback is paused
    pub fn paused(&self) -> bool {
        self.paused
    }

    /// Active overlapping shots
    pub fn instance_count(&self) -> u32 {
        self.instance_count
    }

    /// Last known playback position, ms
    pub fn position(&self) -> u32 {
        self.position_ms
    }

    /// Duration in ms, when known
    pub fn duration(&self) -> Option<u32> {
        self.duration_ms
    }

    /// Bytes received so far
    pub fn bytes_loaded(&self) -> u64 {
        self.bytes_loaded
    }

    /// Total bytes, when known
    pub fn bytes_total(&self) -> u64 {
        self.bytes_total
    }

    /// Current volume, 0-100 (unchanged by mute)
    pub fn volume(&self) -> u8 {
        self.volume
    }

    /// Current pan, -100..=100
    pub fn pan(&self) -> i8 {
        self.pan
    }

    /// Whether this sound is muted (per-sound or globally)
    pub fn muted(&self) -> bool {
        self.is_muted()
    }

    /// Backend servicing this sound
    pub fn backend_kind(&self) -> duet_core::BackendKind {
        self.backend.kind()
    }
}

//! Sound registry: the host-facing surface
//!
//! Owns every session, the capability oracle, the shared poll
//! scheduler and the outbound event queue. All operations address
//! sounds by ID and fail fast on unknown IDs.

use crate::backend::{BackendAdapter, DriverFactory};
use crate::error::{PlaybackError, Result};
use crate::events::SoundEvent;
use crate::session::SoundSession;
use crate::watch::PollScheduler;
use duet_core::{
    BackendKind, BackendSupport, CanPlay, CapabilityOracle, PlayOptions, Setup, SoundOptions,
};
use std::collections::{HashMap, HashSet};
use std::time::Duration;

/// Whether the system came up usable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemState {
    /// Capability check passed; sounds can be created
    Ready,

    /// A required format had no backend; every operation is refused
    Disabled,
}

/// The playback system
pub struct Registry {
    setup: Setup,
    oracle: Option<CapabilityOracle>,
    factory: Box<dyn DriverFactory>,
    sessions: HashMap<String, SoundSession>,
    /// Creation order, for deterministic iteration
    sound_ids: Vec<String>,
    scheduler: PollScheduler,
    subscribed: HashSet<String>,
    pending_events: Vec<SoundEvent>,
    state: SystemState,
    muted_all: bool,
}

impl Registry {
    /// Bring the system up against probed backend support tables
    ///
    /// The startup verdict is queued as the first event: `SystemReady`
    /// on success, `SystemTimeout` when a required format has no
    /// backend. A disabled registry stays constructible so the host
    /// can render a degraded state instead of crashing.
    pub fn new(
        setup: Setup,
        native: BackendSupport,
        plugin: BackendSupport,
        factory: Box<dyn DriverFactory>,
    ) -> Self {
        let mut pending_events = Vec::new();
        let (oracle, state) = match CapabilityOracle::new(&setup, native, plugin) {
            Ok(oracle) => {
                pending_events.push(SoundEvent::SystemReady);
                (Some(oracle), SystemState::Ready)
            }
            Err(err) => {
                tracing::warn!(%err, "capability check failed, system disabled");
                pending_events.push(SoundEvent::SystemTimeout);
                (None, SystemState::Disabled)
            }
        };
        let scheduler = PollScheduler::new(setup.poll_interval);
        Self {
            setup,
            oracle,
            factory,
            sessions: HashMap::new(),
            sound_ids: Vec::new(),
            scheduler,
            subscribed: HashSet::new(),
            pending_events,
            state,
            muted_all: false,
        }
    }

    /// Startup verdict
    pub fn state(&self) -> SystemState {
        self.state
    }

    /// Whether a MIME type or URL is playable, and by which backend
    pub fn can_play(&self, mime_or_url: &str) -> CanPlay {
        match &self.oracle {
            Some(oracle) => oracle.can_play(mime_or_url),
            None => CanPlay::No,
        }
    }

    /// Register a sound
    ///
    /// Idempotent: an existing ID returns the existing sound untouched.
    /// URL candidates resolve through the oracle; the first playable
    /// entry wins, falling back to the first entry when none is.
    pub fn create_sound(&mut self, id: &str, options: SoundOptions) -> Result<()> {
        let Some(oracle) = &self.oracle else {
            return Err(PlaybackError::Disabled);
        };
        if self.sessions.contains_key(id) {
            tracing::debug!(id, "sound already exists, returning existing");
            return Ok(());
        }
        let resolved = oracle.resolve_url(&options.url)?;
        let backend = self.make_adapter(resolved.backend, &resolved.url, options.server_url.as_deref());
        let mut session = SoundSession::new(id.to_string(), options.clone(), backend, resolved.url);
        if self.muted_all {
            session.set_global_muted(true);
        }
        if options.auto_play {
            session.play(&PlayOptions::default(), &mut self.pending_events);
        } else if options.auto_load {
            session.load();
        }
        self.sessions.insert(id.to_string(), session);
        self.sound_ids.push(id.to_string());
        self.sync_poll();
        Ok(())
    }

    /// Register a sound with one URL and the setup default options
    pub fn create_sound_from_url(&mut self, id: &str, url: &str) -> Result<()> {
        let mut options = self.setup.default_options.clone();
        options.url = vec![url.to_string()];
        self.create_sound(id, options)
    }

    fn make_adapter(
        &mut self,
        kind: BackendKind,
        url: &str,
        server_url: Option<&str>,
    ) -> BackendAdapter {
        let mut adapter = match kind {
            BackendKind::Native => BackendAdapter::native(self.factory.media_element()),
            BackendKind::Plugin => BackendAdapter::plugin(self.factory.plugin_channel()),
        };
        adapter.attach_source(url, server_url);
        adapter
    }

    /// Remove a sound entirely, releasing its backend resource
    pub fn destroy_sound(&mut self, id: &str) -> Result<()> {
        let Some(mut session) = self.sessions.remove(id) else {
            return Err(PlaybackError::UnknownSound(id.to_string()));
        };
        session.destroy(&mut self.pending_events);
        self.sound_ids.retain(|existing| existing != id);
        if self.subscribed.remove(id) {
            self.scheduler.unsubscribe();
        }
        Ok(())
    }

    /// Begin loading a sound
    pub fn load(&mut self, id: &str) -> Result<()> {
        self.session_mut(id)?.load();
        Ok(())
    }

    /// Abort a sound's transfer and drop its loaded data
    pub fn unload(&mut self, id: &str) -> Result<()> {
        let session = self
            .sessions
            .get_mut(id)
            .ok_or_else(|| PlaybackError::UnknownSound(id.to_string()))?;
        session.unload(&mut self.pending_events);
        self.sync_poll();
        Ok(())
    }

    /// Play a sound, layering per-call options over its own
    ///
    /// A call that carries a new URL list rebinds the sound to the
    /// newly resolved source first.
    pub fn play(&mut self, id: &str, opts: &PlayOptions) -> Result<()> {
        if let Some(candidates) = &opts.url {
            self.rebind(id, candidates.clone())?;
        }
        let session = self
            .sessions
            .get_mut(id)
            .ok_or_else(|| PlaybackError::UnknownSound(id.to_string()))?;
        session.play(opts, &mut self.pending_events);
        self.sync_poll();
        Ok(())
    }

    fn rebind(&mut self, id: &str, candidates: Vec<String>) -> Result<()> {
        let Some(oracle) = &self.oracle else {
            return Err(PlaybackError::Disabled);
        };
        let current = self
            .sessions
            .get(id)
            .ok_or_else(|| PlaybackError::UnknownSound(id.to_string()))?;
        let resolved = oracle.resolve_url(&candidates)?;
        if resolved.url == current.url() {
            return Ok(());
        }
        tracing::debug!(id, url = %resolved.url, "rebinding sound to new source");
        let mut options = current.options().clone();
        options.url = candidates;
        let server_url = options.server_url.clone();
        let backend = self.make_adapter(resolved.backend, &resolved.url, server_url.as_deref());
        if let Some(session) = self.sessions.get_mut(id) {
            session.rebind(resolved.url, options, backend);
        }
        Ok(())
    }

    /// Pause a sound
    pub fn pause(&mut self, id: &str) -> Result<()> {
        let session = self
            .sessions
            .get_mut(id)
            .ok_or_else(|| PlaybackError::UnknownSound(id.to_string()))?;
        session.pause(&mut self.pending_events);
        self.sync_poll();
        Ok(())
    }

    /// Resume a paused sound
    pub fn resume(&mut self, id: &str) -> Result<()> {
        let session = self
            .sessions
            .get_mut(id)
            .ok_or_else(|| PlaybackError::UnknownSound(id.to_string()))?;
        session.resume(&mut self.pending_events);
        self.sync_poll();
        Ok(())
    }

    /// Pause when playing, resume when paused
    pub fn toggle_pause(&mut self, id: &str) -> Result<()> {
        let session = self
            .sessions
            .get_mut(id)
            .ok_or_else(|| PlaybackError::UnknownSound(id.to_string()))?;
        session.toggle_pause(&mut self.pending_events);
        self.sync_poll();
        Ok(())
    }

    /// Stop all shots of a sound
    pub fn stop(&mut self, id: &str) -> Result<()> {
        let session = self
            .sessions
            .get_mut(id)
            .ok_or_else(|| PlaybackError::UnknownSound(id.to_string()))?;
        session.stop(&mut self.pending_events);
        self.sync_poll();
        Ok(())
    }

    /// Seek a sound to an absolute position
    pub fn set_position(&mut self, id: &str, position_ms: i64) -> Result<()> {
        if position_ms < 0 {
            return Err(PlaybackError::InvalidPosition(position_ms));
        }
        #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
        let position_ms = position_ms as u32;
        self.session_mut(id)?.set_position(position_ms);
        Ok(())
    }

    /// Set a sound's volume, 0-100
    pub fn set_volume(&mut self, id: &str, volume: u8) -> Result<()> {
        self.session_mut(id)?.set_volume(volume);
        Ok(())
    }

    /// Set a sound's pan, -100..=100
    pub fn set_pan(&mut self, id: &str, pan: i8) -> Result<()> {
        self.session_mut(id)?.set_pan(pan);
        Ok(())
    }

    /// Mute one sound
    pub fn mute(&mut self, id: &str) -> Result<()> {
        self.session_mut(id)?.set_muted(true);
        Ok(())
    }

    /// Unmute one sound
    pub fn unmute(&mut self, id: &str) -> Result<()> {
        self.session_mut(id)?.set_muted(false);
        Ok(())
    }

    /// Mute every sound, current and future
    pub fn mute_all(&mut self) {
        self.muted_all = true;
        for id in &self.sound_ids {
            if let Some(session) = self.sessions.get_mut(id) {
                session.set_global_muted(true);
            }
        }
    }

    /// Lift the system-wide mute
    ///
    /// Sounds muted individually stay muted.
    pub fn unmute_all(&mut self) {
        self.muted_all = false;
        for id in &self.sound_ids {
            if let Some(session) = self.sessions.get_mut(id) {
                session.set_global_muted(false);
            }
        }
    }

    /// Pause every playing sound, in creation order
    pub fn pause_all(&mut self) {
        for id in &self.sound_ids {
            if let Some(session) = self.sessions.get_mut(id) {
                session.pause(&mut self.pending_events);
            }
        }
        self.sync_poll();
    }

    /// Resume every paused sound, in creation order
    pub fn resume_all(&mut self) {
        for id in &self.sound_ids {
            if let Some(session) = self.sessions.get_mut(id) {
                session.resume(&mut self.pending_events);
            }
        }
        self.sync_poll();
    }

    /// Stop every sound, in creation order
    pub fn stop_all(&mut self) {
        for id in &self.sound_ids {
            if let Some(session) = self.sessions.get_mut(id) {
                session.stop(&mut self.pending_events);
            }
        }
        self.sync_poll();
    }

    /// Arm a position watch on a sound
    pub fn watch_position(&mut self, id: &str, position_ms: u32) -> Result<()> {
        self.session_mut(id)?.watch_position(position_ms);
        Ok(())
    }

    /// Remove position watches from a sound; `None` removes all
    /// explicitly armed watches
    pub fn clear_position(&mut self, id: &str, position_ms: Option<u32>) -> Result<()> {
        self.session_mut(id)?.clear_position(position_ms);
        Ok(())
    }

    /// Service backend events and the poll cycle
    ///
    /// The host calls this once per timer tick (and whenever driver
    /// callbacks have arrived). Sessions on the polled backend are
    /// sampled; push-backend sessions only get their queued callbacks
    /// applied. Sounds are serviced in creation order, so their
    /// events interleave deterministically.
    pub fn tick(&mut self) {
        for id in &self.sound_ids {
            if let Some(session) = self.sessions.get_mut(id) {
                session.pump(&mut self.pending_events);
            }
        }
        for id in &self.sound_ids {
            if !self.subscribed.contains(id) {
                continue;
            }
            if let Some(session) = self.sessions.get_mut(id) {
                session.poll(&mut self.pending_events);
            }
        }
        self.sync_poll();
    }

    /// Take every event queued since the last drain
    pub fn drain_events(&mut self) -> Vec<SoundEvent> {
        std::mem::take(&mut self.pending_events)
    }

    /// Whether the host timer should be running
    pub fn poll_active(&self) -> bool {
        self.scheduler.is_active()
    }

    /// Interval the host timer should use
    pub fn poll_interval(&self) -> Duration {
        self.scheduler.interval()
    }

    /// Look a sound up by ID
    pub fn sound(&self, id: &str) -> Option<&SoundSession> {
        self.sessions.get(id)
    }

    /// Sound IDs in creation order
    pub fn sound_ids(&self) -> &[String] {
        &self.sound_ids
    }

    /// Number of registered sounds
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether no sounds are registered
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn session_mut(&mut self, id: &str) -> Result<&mut SoundSession> {
        self.sessions
            .get_mut(id)
            .ok_or_else(|| PlaybackError::UnknownSound(id.to_string()))
    }

    /// Reconcile poll subscriptions with what each session needs
    fn sync_poll(&mut self) {
        for id in &self.sound_ids {
            let Some(session) = self.sessions.get(id) else {
                continue;
            };
            let needs = session.needs_poll();
            let has = self.subscribed.contains(id);
            if needs && !has {
                self.subscribed.insert(id.clone());
                self.scheduler.subscribe();
            } else if !needs && has {
                self.subscribed.remove(id);
                self.scheduler.unsubscribe();
            }
        }
    }
}

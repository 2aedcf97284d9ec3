//! Plugin channel adapter
//!
//! Drives one sound registered with the plugin bridge. The plugin
//! pushes position callbacks on its own, so sounds on this backend
//! never join the shared poll timer.
//!
//! Connection-oriented streams need a connect round trip before a
//! start command is meaningful; a play issued before the connection
//! verdict is held and replayed when the plugin reports `Connected`.

use super::{AdapterEvent, BackendCapabilities, DriverResult, PluginCallback, PluginChannel};
use duet_core::Loops;

/// Adapter over one plugin sound channel
pub struct PluginAdapter {
    channel: Box<dyn PluginChannel>,
    server_url: Option<String>,
    connected: bool,
    /// Start deferred until the connection verdict arrives
    pending_start: Option<(u32, Loops, bool)>,
    last_position_ms: u32,
    duration_ms: Option<u32>,
    pending: Vec<AdapterEvent>,
}

impl PluginAdapter {
    /// Wrap a host plugin channel
    pub fn new(channel: Box<dyn PluginChannel>) -> Self {
        Self {
            channel,
            server_url: None,
            connected: false,
            pending_start: None,
            last_position_ms: 0,
            duration_ms: None,
            pending: Vec::new(),
        }
    }

    pub(super) fn capabilities(&self) -> BackendCapabilities {
        BackendCapabilities {
            exact_loop_count: true,
            panning: true,
            streaming_seek: true,
            push_position: true,
        }
    }

    fn guard(&mut self, result: DriverResult) {
        if let Err(err) = result {
            tracing::debug!(code = err.code, %err, "plugin call failed");
            self.pending.push(AdapterEvent::Error { code: err.code });
        }
    }

    /// Plugin wire form: zero means loop forever, so a zero repeat
    /// request clamps to a single play.
    fn loop_count(loops: Loops) -> u32 {
        match loops {
            Loops::Count(n) => n.max(1),
            Loops::Infinite => 0,
        }
    }

    pub(super) fn attach_source(&mut self, url: &str, server_url: Option<&str>) {
        self.server_url = server_url.map(str::to_string);
        self.connected = false;
        self.channel.create_sound(url);
    }

    pub(super) fn load(&mut self) {
        if let Some(server_url) = self.server_url.clone() {
            let result = self.channel.connect(&server_url);
            self.guard(result);
        } else {
            let result = self.channel.begin_load();
            self.guard(result);
        }
    }

    pub(super) fn play(&mut self, position_ms: u32, loops: Loops, multi_shot: bool) {
        if self.server_url.is_some() && !self.connected {
            self.pending_start = Some((position_ms, loops, multi_shot));
            self.load();
            return;
        }
        let result = self
            .channel
            .start(position_ms, Self::loop_count(loops), multi_shot);
        self.guard(result);
    }

    pub(super) fn pause(&mut self) {
        self.channel.pause_toggle();
    }

    pub(super) fn resume(&mut self) {
        self.channel.pause_toggle();
    }

    pub(super) fn stop(&mut self) {
        self.pending_start = None;
        self.channel.stop();
    }

    pub(super) fn seek(&mut self, position_ms: u32) {
        self.last_position_ms = position_ms;
        let result = self.channel.set_position(position_ms);
        self.guard(result);
    }

    pub(super) fn set_volume(&mut self, volume: u8) {
        self.channel.set_volume(volume.min(100));
    }

    pub(super) fn set_pan(&mut self, pan: i8) {
        self.channel.set_pan(pan.clamp(-100, 100));
    }

    /// The plugin mutes by zeroing volume; `restore_volume` is
    /// reapplied on unmute.
    pub(super) fn apply_mute(&mut self, muted: bool, restore_volume: u8) {
        if muted {
            self.channel.set_volume(0);
        } else {
            self.channel.set_volume(restore_volume.min(100));
        }
    }

    pub(super) fn unload(&mut self) {
        self.connected = false;
        self.pending_start = None;
        self.channel.unload();
    }

    pub(super) fn destroy(&mut self) {
        self.channel.destroy_sound();
    }

    pub(super) fn position(&self) -> u32 {
        self.last_position_ms
    }

    pub(super) fn duration(&self) -> Option<u32> {
        self.duration_ms
    }

    pub(super) fn poll_events(&mut self) -> Vec<AdapterEvent> {
        let mut out = std::mem::take(&mut self.pending);
        for callback in self.channel.take_callbacks() {
            match callback {
                PluginCallback::Loaded { success } => {
                    if success {
                        out.push(AdapterEvent::Ready);
                    } else {
                        out.push(AdapterEvent::Error { code: 0 });
                    }
                }
                PluginCallback::WhilePlaying { position_ms } => {
                    self.last_position_ms = position_ms;
                    out.push(AdapterEvent::PositionTick(position_ms));
                }
                PluginCallback::WhileLoading {
                    bytes_loaded,
                    bytes_total,
                    duration_ms,
                } => {
                    if duration_ms.is_some() {
                        self.duration_ms = duration_ms;
                    }
                    out.push(AdapterEvent::LoadProgress {
                        bytes_loaded,
                        bytes_total,
                        duration_ms,
                    });
                }
                PluginCallback::Finished => out.push(AdapterEvent::Finished),
                PluginCallback::Id3 { tags } => out.push(AdapterEvent::Id3 { tags }),
                PluginCallback::Connected { success } => {
                    self.connected = success;
                    if success {
                        if let Some((position_ms, loops, multi_shot)) = self.pending_start.take() {
                            let result = self.channel.start(
                                position_ms,
                                Self::loop_count(loops),
                                multi_shot,
                            );
                            if let Err(err) = result {
                                out.push(AdapterEvent::Error { code: err.code });
                            }
                        }
                    } else {
                        self.pending_start = None;
                    }
                    out.push(AdapterEvent::Connected { success });
                }
                PluginCallback::Failure { code } => out.push(AdapterEvent::Error { code }),
                PluginCallback::BufferChange { buffering } => {
                    out.push(AdapterEvent::Buffering(buffering));
                }
            }
        }
        out
    }
}

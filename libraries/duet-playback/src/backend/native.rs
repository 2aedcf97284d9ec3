//! Native media-element adapter
//!
//! Drives one host-provided media element. The element has no push
//! position events; the shared poll timer samples `position()`
//! instead. Pan is not expressible and no-ops.

use super::{AdapterEvent, BackendCapabilities, DriverResult, MediaElement, MediaElementEvent};
use duet_core::Loops;

/// Adapter over one native media element
pub struct NativeAdapter {
    element: Box<dyn MediaElement>,
    /// Errors converted at the boundary, delivered with the next poll
    pending: Vec<AdapterEvent>,
}

impl NativeAdapter {
    /// Wrap a host media element
    pub fn new(element: Box<dyn MediaElement>) -> Self {
        Self {
            element,
            pending: Vec::new(),
        }
    }

    pub(super) fn capabilities(&self) -> BackendCapabilities {
        BackendCapabilities {
            exact_loop_count: false,
            panning: false,
            streaming_seek: false,
            push_position: false,
        }
    }

    /// Convert a failed driver call into an error event
    fn guard(&mut self, result: DriverResult) {
        if let Err(err) = result {
            tracing::debug!(code = err.code, %err, "media element call failed");
            self.pending.push(AdapterEvent::Error { code: err.code });
        }
    }

    pub(super) fn attach_source(&mut self, url: &str) {
        self.element.set_source(url);
    }

    pub(super) fn load(&mut self) {
        let result = self.element.begin_load();
        self.guard(result);
    }

    pub(super) fn play(&mut self, position_ms: u32, loops: Loops) {
        // finite counts > 1 were already degraded to infinite upstream
        self.element.set_loop(loops.repeats());
        if position_ms > 0 || self.element.current_time() != position_ms {
            let seek = self.element.set_current_time(position_ms);
            self.guard(seek);
        }
        let result = self.element.play();
        self.guard(result);
    }

    pub(super) fn pause(&mut self) {
        self.element.pause();
    }

    pub(super) fn resume(&mut self) {
        let result = self.element.play();
        self.guard(result);
    }

    pub(super) fn stop(&mut self) {
        // the element has no stop(); rewind and pause instead
        let seek = self.element.set_current_time(0);
        self.guard(seek);
        self.element.pause();
    }

    pub(super) fn seek(&mut self, position_ms: u32) {
        let result = self.element.set_current_time(position_ms);
        self.guard(result);
    }

    pub(super) fn set_volume(&mut self, volume: u8) {
        self.element.set_volume(f32::from(volume.min(100)) / 100.0);
    }

    pub(super) fn set_pan(&mut self, pan: i8) {
        // the element cannot pan
        let _ = pan;
        tracing::debug!("pan is not supported on the native backend");
    }

    pub(super) fn apply_mute(&mut self, muted: bool) {
        self.element.set_muted(muted);
    }

    pub(super) fn unload(&mut self) {
        self.element.unload();
    }

    pub(super) fn destroy(&mut self) {
        self.element.release();
    }

    pub(super) fn position(&self) -> u32 {
        self.element.current_time()
    }

    pub(super) fn duration(&self) -> Option<u32> {
        self.element.duration()
    }

    pub(super) fn poll_events(&mut self) -> Vec<AdapterEvent> {
        let mut out = std::mem::take(&mut self.pending);
        for event in self.element.take_events() {
            out.push(match event {
                MediaElementEvent::CanPlay => AdapterEvent::Ready,
                MediaElementEvent::Progress {
                    bytes_loaded,
                    bytes_total,
                    duration_ms,
                } => AdapterEvent::LoadProgress {
                    bytes_loaded,
                    bytes_total,
                    duration_ms,
                },
                MediaElementEvent::Ended => AdapterEvent::Finished,
                MediaElementEvent::Error { code } => AdapterEvent::Error { code },
                MediaElementEvent::Stalled(stalled) => AdapterEvent::Buffering(stalled),
            });
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DriverError;

    #[derive(Default)]
    struct FakeElement {
        source: Option<String>,
        current_ms: u32,
        playing: bool,
        muted: bool,
        volume: f32,
        looping: bool,
        fail_play: bool,
        events: Vec<MediaElementEvent>,
        released: bool,
    }

    impl MediaElement for FakeElement {
        fn set_source(&mut self, url: &str) {
            self.source = Some(url.to_string());
        }
        fn begin_load(&mut self) -> DriverResult {
            Ok(())
        }
        fn play(&mut self) -> DriverResult {
            if self.fail_play {
                return Err(DriverError::new(4, "no source"));
            }
            self.playing = true;
            Ok(())
        }
        fn pause(&mut self) {
            self.playing = false;
        }
        fn set_current_time(&mut self, position_ms: u32) -> DriverResult {
            self.current_ms = position_ms;
            Ok(())
        }
        fn current_time(&self) -> u32 {
            self.current_ms
        }
        fn duration(&self) -> Option<u32> {
            Some(10_000)
        }
        fn set_volume(&mut self, volume: f32) {
            self.volume = volume;
        }
        fn set_muted(&mut self, muted: bool) {
            self.muted = muted;
        }
        fn set_loop(&mut self, looping: bool) {
            self.looping = looping;
        }
        fn unload(&mut self) {
            self.source = None;
        }
        fn release(&mut self) {
            self.released = true;
        }
        fn take_events(&mut self) -> Vec<MediaElementEvent> {
            std::mem::take(&mut self.events)
        }
    }

    #[test]
    fn normalizes_element_events() {
        let element = FakeElement {
            events: vec![
                MediaElementEvent::CanPlay,
                MediaElementEvent::Stalled(true),
                MediaElementEvent::Ended,
            ],
            ..FakeElement::default()
        };
        let mut adapter = NativeAdapter::new(Box::new(element));
        let events = adapter.poll_events();
        assert_eq!(
            events,
            vec![
                AdapterEvent::Ready,
                AdapterEvent::Buffering(true),
                AdapterEvent::Finished,
            ]
        );
    }

    #[test]
    fn play_failure_becomes_error_event() {
        let element = FakeElement {
            fail_play: true,
            ..FakeElement::default()
        };
        let mut adapter = NativeAdapter::new(Box::new(element));
        adapter.play(0, Loops::Count(1));
        let events = adapter.poll_events();
        assert_eq!(events, vec![AdapterEvent::Error { code: 4 }]);
    }

    #[test]
    fn play_applies_loop_flag_and_seek() {
        let mut adapter = NativeAdapter::new(Box::<FakeElement>::default());
        adapter.attach_source("a.mp3");
        adapter.play(2000, Loops::Infinite);
        assert_eq!(adapter.position(), 2000);
        assert!(adapter.poll_events().is_empty());
    }

    #[test]
    fn volume_maps_to_unit_range() {
        let mut adapter = NativeAdapter::new(Box::<FakeElement>::default());
        adapter.set_volume(50);
        // no observable error path; just exercise clamping
        adapter.set_volume(200);
    }
}

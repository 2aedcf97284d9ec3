//! Shared mock drivers for integration tests
//!
//! The mocks record every command and let tests inject driver events
//! after the registry has taken ownership, via shared state handles
//! captured by the factory log.

#![allow(dead_code)]

use duet_core::{BackendSupport, Format, Setup};
use duet_playback::backend::{
    DriverFactory, DriverResult, MediaElement, MediaElementEvent, PluginCallback, PluginChannel,
};
use duet_playback::Registry;
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Default)]
pub struct ElementState {
    pub source: Option<String>,
    pub current_ms: u32,
    pub playing: bool,
    pub volume: f32,
    pub muted: bool,
    pub looping: bool,
    pub loads: u32,
    pub unloaded: bool,
    pub released: bool,
    pub events: Vec<MediaElementEvent>,
}

pub struct MockElement {
    state: Rc<RefCell<ElementState>>,
}

impl MediaElement for MockElement {
    fn set_source(&mut self, url: &str) {
        self.state.borrow_mut().source = Some(url.to_string());
    }

    fn begin_load(&mut self) -> DriverResult {
        self.state.borrow_mut().loads += 1;
        Ok(())
    }

    fn play(&mut self) -> DriverResult {
        self.state.borrow_mut().playing = true;
        Ok(())
    }

    fn pause(&mut self) {
        self.state.borrow_mut().playing = false;
    }

    fn set_current_time(&mut self, position_ms: u32) -> DriverResult {
        self.state.borrow_mut().current_ms = position_ms;
        Ok(())
    }

    fn current_time(&self) -> u32 {
        self.state.borrow().current_ms
    }

    fn duration(&self) -> Option<u32> {
        Some(30_000)
    }

    fn set_volume(&mut self, volume: f32) {
        self.state.borrow_mut().volume = volume;
    }

    fn set_muted(&mut self, muted: bool) {
        self.state.borrow_mut().muted = muted;
    }

    fn set_loop(&mut self, looping: bool) {
        self.state.borrow_mut().looping = looping;
    }

    fn unload(&mut self) {
        self.state.borrow_mut().unloaded = true;
    }

    fn release(&mut self) {
        self.state.borrow_mut().released = true;
    }

    fn take_events(&mut self) -> Vec<MediaElementEvent> {
        std::mem::take(&mut self.state.borrow_mut().events)
    }
}

#[derive(Default)]
pub struct ChannelState {
    pub url: Option<String>,
    pub connected_to: Option<String>,
    pub loads: u32,
    /// (position_ms, loops, multi_shot) per start command
    pub starts: Vec<(u32, u32, bool)>,
    pub pause_toggles: u32,
    pub stops: u32,
    pub volume: u8,
    pub pan: i8,
    pub unloaded: bool,
    pub destroyed: bool,
    pub callbacks: Vec<PluginCallback>,
}

pub struct MockChannel {
    state: Rc<RefCell<ChannelState>>,
}

impl PluginChannel for MockChannel {
    fn create_sound(&mut self, url: &str) {
        self.state.borrow_mut().url = Some(url.to_string());
    }

    fn begin_load(&mut self) -> DriverResult {
        self.state.borrow_mut().loads += 1;
        Ok(())
    }

    fn connect(&mut self, server_url: &str) -> DriverResult {
        self.state.borrow_mut().connected_to = Some(server_url.to_string());
        Ok(())
    }

    fn start(&mut self, position_ms: u32, loops: u32, multi_shot: bool) -> DriverResult {
        self.state
            .borrow_mut()
            .starts
            .push((position_ms, loops, multi_shot));
        Ok(())
    }

    fn pause_toggle(&mut self) {
        self.state.borrow_mut().pause_toggles += 1;
    }

    fn stop(&mut self) {
        self.state.borrow_mut().stops += 1;
    }

    fn set_position(&mut self, _position_ms: u32) -> DriverResult {
        Ok(())
    }

    fn set_volume(&mut self, volume: u8) {
        self.state.borrow_mut().volume = volume;
    }

    fn set_pan(&mut self, pan: i8) {
        self.state.borrow_mut().pan = pan;
    }

    fn unload(&mut self) {
        self.state.borrow_mut().unloaded = true;
    }

    fn destroy_sound(&mut self) {
        self.state.borrow_mut().destroyed = true;
    }

    fn take_callbacks(&mut self) -> Vec<PluginCallback> {
        std::mem::take(&mut self.state.borrow_mut().callbacks)
    }
}

/// Handles to every driver the factory has handed out, in order
#[derive(Default)]
pub struct FactoryLog {
    pub elements: Vec<Rc<RefCell<ElementState>>>,
    pub channels: Vec<Rc<RefCell<ChannelState>>>,
}

pub struct MockFactory {
    log: Rc<RefCell<FactoryLog>>,
}

impl DriverFactory for MockFactory {
    fn media_element(&mut self) -> Box<dyn MediaElement> {
        let state = Rc::new(RefCell::new(ElementState::default()));
        self.log.borrow_mut().elements.push(Rc::clone(&state));
        Box::new(MockElement { state })
    }

    fn plugin_channel(&mut self) -> Box<dyn PluginChannel> {
        let state = Rc::new(RefCell::new(ChannelState::default()));
        self.log.borrow_mut().channels.push(Rc::clone(&state));
        Box::new(MockChannel { state })
    }
}

pub fn mock_factory() -> (Box<dyn DriverFactory>, Rc<RefCell<FactoryLog>>) {
    let log = Rc::new(RefCell::new(FactoryLog::default()));
    (Box::new(MockFactory {
        log: Rc::clone(&log),
    }), log)
}

/// Registry where only the native backend plays mp3
pub fn registry_native_mp3() -> (Registry, Rc<RefCell<FactoryLog>>) {
    let (factory, log) = mock_factory();
    let native = BackendSupport::unprobed().with(Format::Mp3, true);
    let registry = Registry::new(Setup::default(), native, BackendSupport::unprobed(), factory);
    (registry, log)
}

/// Registry where only the plugin backend plays mp3
pub fn registry_plugin_mp3() -> (Registry, Rc<RefCell<FactoryLog>>) {
    let (factory, log) = mock_factory();
    let plugin = BackendSupport::unprobed().with(Format::Mp3, true);
    let registry = Registry::new(Setup::default(), BackendSupport::unprobed(), plugin, factory);
    (registry, log)
}

/// Registry where mp3 routes native and mp4 routes plugin
pub fn registry_both() -> (Registry, Rc<RefCell<FactoryLog>>) {
    let (factory, log) = mock_factory();
    let native = BackendSupport::unprobed().with(Format::Mp3, true);
    let plugin = BackendSupport::unprobed()
        .with(Format::Mp3, true)
        .with(Format::Mp4, true);
    let registry = Registry::new(Setup::default(), native, plugin, factory);
    (registry, log)
}

pub fn push_element_event(log: &Rc<RefCell<FactoryLog>>, index: usize, event: MediaElementEvent) {
    log.borrow().elements[index].borrow_mut().events.push(event);
}

pub fn push_channel_callback(
    log: &Rc<RefCell<FactoryLog>>,
    index: usize,
    callback: PluginCallback,
) {
    log.borrow().channels[index]
        .borrow_mut()
        .callbacks
        .push(callback);
}

//! Duet - Playback Sessions
//!
//! Backend-agnostic sound sessions for Duet.
//!
//! This crate provides:
//! - A sound registry addressing every sound by ID
//! - Per-sound session state machines (load, play, pause, stop, seek)
//! - Overlapping multi-shot playback with instance counting
//! - Position watches and from/to playback windows
//! - Volume, pan, per-sound mute and system-wide mute
//! - A shared poll scheduler for backends without push position events
//!
//! # Architecture
//!
//! `duet-playback` never talks to an audio engine directly. The host
//! implements the [`MediaElement`] and [`PluginChannel`] driver traits
//! and hands in a [`DriverFactory`]; adapters normalize both engines
//! into one event stream and the sessions maintain canonical state on
//! top of it. Everything is single-threaded: the host calls in, state
//! commits, and queued [`SoundEvent`]s are drained afterwards.
//!
//! # Example
//!
//! ```rust,no_run
//! use duet_playback::{Registry, SoundEvent};
//! use duet_playback::backend::{DriverFactory, MediaElement, PluginChannel};
//! use duet_core::{BackendSupport, Format, Setup};
//!
//! # struct MyFactory;
//! # impl DriverFactory for MyFactory {
//! #     fn media_element(&mut self) -> Box<dyn MediaElement> { unimplemented!() }
//! #     fn plugin_channel(&mut self) -> Box<dyn PluginChannel> { unimplemented!() }
//! # }
//! let native = BackendSupport::unprobed().with(Format::Mp3, true);
//! let plugin = BackendSupport::unprobed().with(Format::Mp3, true);
//! let mut registry = Registry::new(
//!     Setup::default(),
//!     native,
//!     plugin,
//!     Box::new(MyFactory),
//! );
//!
//! registry.create_sound_from_url("intro", "audio/intro.mp3").ok();
//! registry.play("intro", &Default::default()).ok();
//!
//! // host timer / callback pump
//! registry.tick();
//! for event in registry.drain_events() {
//!     match event {
//!         SoundEvent::Finish { id } => println!("{id} finished"),
//!         _ => {}
//!     }
//! }
//! ```

#![warn(missing_docs)]

pub mod backend;
mod error;
mod events;
mod registry;
mod session;
mod watch;

// Public exports
pub use backend::{DriverFactory, MediaElement, PluginChannel};
pub use error::{PlaybackError, Result};
pub use events::SoundEvent;
pub use registry::{Registry, SystemState};
pub use session::SoundSession;
pub use watch::{PollScheduler, PollTransition, WatchKind, WatchList};

//! # Media Control Core
//!
//! Turns heterogeneous platform media backends into one asynchronous
//! play/pause/state API.
//!
//! ## Overview
//!
//! This crate provides:
//! - [`UnifiedMediaController`]: wraps a blocking [`MediaBackend`] and
//!   coalesces, defers and confirms play/pause requests
//! - [`CompletionDetection`]: event-driven or polled confirmation of native
//!   transitions
//! - [`AudioBuffer`]: fixed-capacity sample buffer with frame callbacks
//! - [`DeferredList`]: listener list that tolerates mutation while firing
//! - [`MediaRegistry`]: backend wrapping, named audio buffers and the
//!   remote-control listener slot
//!
//! All controller state lives on a single [`Scheduler`](core_async::Scheduler).
//!
//! ## Usage
//!
//! ```rust
//! use core_async::Scheduler;
//! use core_playback::{Backend, MediaRegistry};
//! # use bridge_traits::MediaBackend;
//! # use std::sync::atomic::{AtomicBool, Ordering};
//! # use std::sync::Arc;
//! # use std::time::Duration;
//! # #[derive(Default)]
//! # struct Player { playing: AtomicBool }
//! # impl MediaBackend for Player {
//! #     fn play(&self) -> bridge_traits::Result<()> { self.playing.store(true, Ordering::SeqCst); Ok(()) }
//! #     fn pause(&self) -> bridge_traits::Result<()> { self.playing.store(false, Ordering::SeqCst); Ok(()) }
//! #     fn is_playing(&self) -> bool { self.playing.load(Ordering::SeqCst) }
//! #     fn time(&self) -> Duration { Duration::ZERO }
//! #     fn set_time(&self, _: Duration) {}
//! #     fn duration(&self) -> Option<Duration> { None }
//! #     fn volume(&self) -> u8 { 100 }
//! #     fn set_volume(&self, _: u8) {}
//! # }
//!
//! let registry = MediaRegistry::new(Scheduler::new());
//! let media = registry.get_async_media(Backend::sync(Arc::new(Player::default())));
//!
//! // With no driver thread, `get` pumps the scheduler itself.
//! media.play_async().get().unwrap();
//! assert!(media.is_playing());
//! ```
//!
//! [`MediaBackend`]: bridge_traits::MediaBackend

pub mod audio_buffer;
pub mod controller;
pub mod detection;
pub mod error;
pub mod events;
pub mod listeners;
pub mod media;
pub mod registry;
pub mod remote;

pub use audio_buffer::{AudioBuffer, AudioBufferCallback, CallbackId};
pub use controller::UnifiedMediaController;
pub use detection::{CompletionDetection, PollConfig};
pub use error::{PlaybackError, Result};
pub use events::{MediaErrorEvent, MediaErrorListener, MediaStateChangeEvent, MediaStateChangeListener};
pub use listeners::{DeferredList, ListenerId};
pub use media::{AsyncMedia, Backend, MediaRequest};
pub use registry::MediaRegistry;
pub use remote::{RemoteCommand, RemoteControlRelay};

//! # Host Bridge Traits
//!
//! Contracts between the media core and the platform code that actually talks
//! to native media APIs.
//!
//! ## Overview
//!
//! The core coordinates playback; it never plays anything itself. Each
//! platform supplies concrete implementations of the traits below, and the
//! core wraps them in a uniform asynchronous API.
//!
//! ## Traits
//!
//! ### Media
//! - [`MediaBackend`](media::MediaBackend) - Blocking play/pause plus the
//!   passive media capabilities (time, volume, video, variables)
//! - [`MediaEventSink`](media::MediaEventSink) - Channel a backend uses to
//!   report native state changes and errors after the fact
//!
//! ### Remote control
//! - [`RemoteControlListener`](remote::RemoteControlListener) - Receiver of
//!   lock-screen / headset / notification media commands
//! - [`RemoteControlService`](remote::RemoteControlService) - Native service
//!   that routes those commands to the process
//!
//! ## Error Handling
//!
//! Synchronous bridge calls fail with [`BridgeError`](error::BridgeError).
//! Media failures reported asynchronously are carried by
//! [`MediaException`](media::MediaException), which is cheap to clone so one
//! native failure can be delivered to every interested party.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync`. Native callbacks may arrive on
//! arbitrary threads; the core marshals them onto its own scheduler.

pub mod error;
pub mod media;
pub mod remote;

pub use error::{BridgeError, Result};
pub use media::{
    MediaBackend, MediaErrorType, MediaEventSink, MediaException, MediaVariable, PlaybackState,
    VideoComponent,
};
pub use remote::{NoopRemoteControlService, RemoteControlListener, RemoteControlService};

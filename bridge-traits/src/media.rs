//! Media bridge traits and supporting types.
//!
//! A [`MediaBackend`] is the platform object that issues native play/pause
//! commands. Backends differ wildly in how they report progress:
//!
//! - some block inside `play()`/`pause()` until the transition happened,
//! - some return immediately and report the new state later through a
//!   [`MediaEventSink`],
//! - some report nothing at all and have to be polled via `is_playing()`.
//!
//! The core hides those differences; backends only have to be honest about
//! `is_playing()` and, when they can, push events into the sink they are
//! given through [`MediaBackend::attach_events`].

use crate::error::{BridgeError, Result};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Playback state as seen by the media core.
///
/// Failures are never a state; they are reported out-of-band as
/// [`MediaException`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlaybackState {
    /// No transition has been confirmed yet.
    Initialized,
    Playing,
    Paused,
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PlaybackState::Initialized => "initialized",
            PlaybackState::Playing => "playing",
            PlaybackState::Paused => "paused",
        };
        f.write_str(name)
    }
}

/// Category of a media failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaErrorType {
    /// Fetching the media was aborted by the user agent or host.
    Aborted,
    /// A network error interrupted loading.
    Network,
    /// The media could not be decoded.
    Decode,
    /// The source format or URI is not supported.
    SourceNotSupported,
    /// The audio line/device could not be acquired.
    LineUnavailable,
    /// A transition was not confirmed in time.
    Timeout,
    Unknown,
}

impl fmt::Display for MediaErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MediaErrorType::Aborted => "aborted",
            MediaErrorType::Network => "network",
            MediaErrorType::Decode => "decode",
            MediaErrorType::SourceNotSupported => "source not supported",
            MediaErrorType::LineUnavailable => "line unavailable",
            MediaErrorType::Timeout => "timeout",
            MediaErrorType::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// A media failure with its category, message and optional cause.
#[derive(Debug, Clone, Error)]
#[error("{kind} media error: {message}")]
pub struct MediaException {
    kind: MediaErrorType,
    message: String,
    #[source]
    cause: Option<Arc<dyn std::error::Error + Send + Sync + 'static>>,
}

impl MediaException {
    pub fn new(kind: MediaErrorType, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            cause: None,
        }
    }

    /// Attach the underlying error.
    pub fn with_cause<E>(mut self, cause: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.cause = Some(Arc::new(cause));
        self
    }

    pub fn kind(&self) -> MediaErrorType {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn cause(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        self.cause.as_deref()
    }

    pub fn is_network_error(&self) -> bool {
        self.kind == MediaErrorType::Network
    }

    pub fn is_timeout(&self) -> bool {
        self.kind == MediaErrorType::Timeout
    }
}

impl From<BridgeError> for MediaException {
    fn from(err: BridgeError) -> Self {
        let kind = match &err {
            BridgeError::NotAvailable(_) => MediaErrorType::SourceNotSupported,
            BridgeError::OperationFailed(_) | BridgeError::Io(_) => MediaErrorType::Unknown,
        };
        MediaException::new(kind, err.to_string()).with_cause(err)
    }
}

/// Opaque native video surface, passed through untouched.
pub type VideoComponent = Arc<dyn Any + Send + Sync>;

/// Value stored in a backend's variable bag.
pub type MediaVariable = serde_json::Value;

/// Receiver for state changes and errors a backend discovers on its own.
///
/// Implementations accept calls from any thread.
pub trait MediaEventSink: Send + Sync {
    /// The backend has entered `state`.
    fn state_changed(&self, state: PlaybackState);

    /// The backend failed.
    fn error(&self, error: MediaException);
}

/// Platform media object.
///
/// `play` and `pause` may block the calling thread. Only `play`, `pause`,
/// `is_playing`, time and volume are mandatory; the remaining capabilities
/// default to "not supported".
pub trait MediaBackend: Send + Sync {
    /// Issue the native play command.
    fn play(&self) -> Result<()>;

    /// Issue the native pause command.
    fn pause(&self) -> Result<()>;

    /// Whether the native player is currently playing.
    fn is_playing(&self) -> bool;

    /// Current playback position.
    fn time(&self) -> Duration;

    fn set_time(&self, position: Duration);

    /// Total length, if known.
    fn duration(&self) -> Option<Duration>;

    /// Volume in `0..=100`.
    fn volume(&self) -> u8;

    fn set_volume(&self, volume: u8);

    fn is_video(&self) -> bool {
        false
    }

    fn is_full_screen(&self) -> bool {
        false
    }

    fn set_full_screen(&self, _full_screen: bool) {}

    fn is_native_player_mode(&self) -> bool {
        false
    }

    fn set_native_player_mode(&self, _native: bool) {}

    /// Native video surface, if this is video media.
    fn video_component(&self) -> Option<VideoComponent> {
        None
    }

    fn variable(&self, _key: &str) -> Option<MediaVariable> {
        None
    }

    fn set_variable(&self, _key: &str, _value: MediaVariable) {}

    /// Acquire native resources ahead of playback.
    fn prepare(&self) -> Result<()> {
        Ok(())
    }

    /// Release native resources.
    fn cleanup(&self) {}

    /// Hand the backend the sink it should report native events to.
    ///
    /// Backends without completion events ignore it.
    fn attach_events(&self, _sink: Arc<dyn MediaEventSink>) {}
}

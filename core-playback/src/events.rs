//! Events delivered to controller listeners.

use bridge_traits::{MediaErrorType, MediaException, PlaybackState};

/// The controller moved from `previous` to `new_state`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaStateChangeEvent {
    pub previous: PlaybackState,
    pub new_state: PlaybackState,
}

impl MediaStateChangeEvent {
    pub fn new(previous: PlaybackState, new_state: PlaybackState) -> Self {
        Self {
            previous,
            new_state,
        }
    }
}

/// A media failure, as broadcast to error listeners.
#[derive(Debug, Clone)]
pub struct MediaErrorEvent {
    pub error: MediaException,
}

impl MediaErrorEvent {
    pub fn new(error: MediaException) -> Self {
        Self { error }
    }

    pub fn kind(&self) -> MediaErrorType {
        self.error.kind()
    }

    pub fn message(&self) -> &str {
        self.error.message()
    }

    pub fn cause(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        self.error.cause()
    }
}

/// Receives [`MediaStateChangeEvent`]s. Implemented for matching closures.
pub trait MediaStateChangeListener: Send + Sync {
    fn state_changed(&self, event: &MediaStateChangeEvent);
}

impl<F> MediaStateChangeListener for F
where
    F: Fn(&MediaStateChangeEvent) + Send + Sync,
{
    fn state_changed(&self, event: &MediaStateChangeEvent) {
        self(event)
    }
}

/// Receives [`MediaErrorEvent`]s. Implemented for matching closures.
pub trait MediaErrorListener: Send + Sync {
    fn media_error(&self, event: &MediaErrorEvent);
}

impl<F> MediaErrorListener for F
where
    F: Fn(&MediaErrorEvent) + Send + Sync,
{
    fn media_error(&self, event: &MediaErrorEvent) {
        self(event)
    }
}

//! The asynchronous media capability set.

use crate::detection::CompletionDetection;
use crate::events::{MediaErrorListener, MediaStateChangeListener};
use crate::listeners::ListenerId;
use bridge_traits::{MediaBackend, MediaException, PlaybackState};
use core_async::AsyncResult;
use std::fmt;
use std::sync::Arc;

/// Outcome of a play or pause request: the media itself, or the failure.
pub type MediaRequest = AsyncResult<Arc<dyn AsyncMedia>, MediaException>;

/// Media with non-blocking play/pause and observable state.
///
/// Everything from [`MediaBackend`] is still available; its `play` and
/// `pause` become fire-and-forget versions of [`play_async`] and
/// [`pause_async`].
///
/// [`play_async`]: AsyncMedia::play_async
/// [`pause_async`]: AsyncMedia::pause_async
pub trait AsyncMedia: MediaBackend {
    /// Request playback. Never blocks.
    fn play_async(&self) -> MediaRequest;

    /// Request a pause. Never blocks.
    fn pause_async(&self) -> MediaRequest;

    fn state(&self) -> PlaybackState;

    /// Listeners are held weakly; keep the `Arc` alive to keep receiving events.
    fn add_state_change_listener(&self, listener: &Arc<dyn MediaStateChangeListener>)
        -> ListenerId;

    fn remove_state_change_listener(&self, id: ListenerId) -> bool;

    /// Listeners are held weakly; keep the `Arc` alive to keep receiving events.
    fn add_error_listener(&self, listener: &Arc<dyn MediaErrorListener>) -> ListenerId;

    fn remove_error_listener(&self, id: ListenerId) -> bool;
}

impl fmt::Debug for dyn AsyncMedia {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncMedia")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

/// A backend handed to [`MediaRegistry::get_async_media`].
///
/// The variant is chosen by whoever constructs the backend, so the registry
/// never has to guess whether it is already asynchronous.
///
/// [`MediaRegistry::get_async_media`]: crate::registry::MediaRegistry::get_async_media
pub enum Backend {
    /// A blocking backend that needs a controller. `detection` of `None`
    /// uses the registry's default.
    Sync {
        backend: Arc<dyn MediaBackend>,
        detection: Option<CompletionDetection>,
    },
    /// Already asynchronous; returned unchanged.
    Async(Arc<dyn AsyncMedia>),
}

impl Backend {
    pub fn sync(backend: Arc<dyn MediaBackend>) -> Self {
        Backend::Sync {
            backend,
            detection: None,
        }
    }

    pub fn sync_with(backend: Arc<dyn MediaBackend>, detection: CompletionDetection) -> Self {
        Backend::Sync {
            backend,
            detection: Some(detection),
        }
    }

    pub fn is_async(&self) -> bool {
        matches!(self, Backend::Async(_))
    }
}

impl From<Arc<dyn AsyncMedia>> for Backend {
    fn from(media: Arc<dyn AsyncMedia>) -> Self {
        Backend::Async(media)
    }
}

impl fmt::Debug for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Sync { detection, .. } => f
                .debug_struct("Sync")
                .field("detection", detection)
                .finish_non_exhaustive(),
            Backend::Async(media) => f.debug_tuple("Async").field(media).finish(),
        }
    }
}

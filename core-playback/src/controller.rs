//! # Unified Media Controller
//!
//! Wraps a blocking [`MediaBackend`] in the [`AsyncMedia`] API.
//!
//! ## Interleaving
//!
//! At most one request drives the backend at any time. Every request is
//! evaluated on the scheduler:
//!
//! 1. a request of the same kind is pending: join it (coalescing);
//! 2. a request of the opposite kind is pending: wait until it settles, then
//!    evaluate again from scratch;
//! 3. the backend already reports the target state: complete immediately;
//! 4. otherwise call the backend and wait for confirmation.
//!
//! Confirmation arrives as a state-change event on the controller's
//! [`MediaEventSink`], or from the poll loop when the backend was wrapped with
//! [`CompletionDetection::Polled`]. Errors (native error events, `Err` from
//! the backend call, poll timeouts) are broadcast to error listeners and fail
//! the pending request together with everything coalesced onto it. After an
//! error the controller re-reads `is_playing()`, so a pause waiting on a
//! failed play completes without touching the backend.
//!
//! State-change listeners always run before the request they confirm is
//! completed.

use crate::detection::{CompletionDetection, PollConfig};
use crate::events::{
    MediaErrorEvent, MediaErrorListener, MediaStateChangeEvent, MediaStateChangeListener,
};
use crate::listeners::{DeferredList, ListenerId};
use crate::media::{AsyncMedia, MediaRequest};
use bridge_traits::{
    MediaBackend, MediaErrorType, MediaEventSink, MediaException, MediaVariable, PlaybackState,
    VideoComponent,
};
use core_async::sync::CancellationToken;
use core_async::Scheduler;
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tracing::{debug, trace, warn};

static NEXT_CONTROLLER_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Intent {
    Play,
    Pause,
}

impl Intent {
    fn target(self) -> PlaybackState {
        match self {
            Intent::Play => PlaybackState::Playing,
            Intent::Pause => PlaybackState::Paused,
        }
    }

    fn opposite(self) -> Intent {
        match self {
            Intent::Play => Intent::Pause,
            Intent::Pause => Intent::Play,
        }
    }

    fn confirmed_by(state: PlaybackState) -> Option<Intent> {
        match state {
            PlaybackState::Playing => Some(Intent::Play),
            PlaybackState::Paused => Some(Intent::Pause),
            PlaybackState::Initialized => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Intent::Play => "play",
            Intent::Pause => "pause",
        }
    }
}

struct ControllerState {
    current: PlaybackState,
    pending_play: Option<MediaRequest>,
    pending_pause: Option<MediaRequest>,
    /// Requests waiting for the opposite pending request to settle.
    deferred: Vec<(Intent, MediaRequest)>,
    poll: Option<CancellationToken>,
}

impl ControllerState {
    fn pending(&mut self, intent: Intent) -> &mut Option<MediaRequest> {
        match intent {
            Intent::Play => &mut self.pending_play,
            Intent::Pause => &mut self.pending_pause,
        }
    }

    fn stop_polling(&mut self) {
        if let Some(token) = self.poll.take() {
            token.cancel();
        }
    }
}

struct Shared {
    id: u64,
    scheduler: Scheduler,
    backend: Arc<dyn MediaBackend>,
    detection: CompletionDetection,
    state: Mutex<ControllerState>,
    state_listeners: DeferredList<Weak<dyn MediaStateChangeListener>>,
    error_listeners: DeferredList<Weak<dyn MediaErrorListener>>,
}

impl Shared {
    fn handle(self: &Arc<Self>) -> Arc<dyn AsyncMedia> {
        Arc::new(UnifiedMediaController {
            shared: Arc::clone(self),
        })
    }

    fn request(self: &Arc<Self>, intent: Intent, out: MediaRequest) {
        if out.is_done() {
            return;
        }

        let mut state = self.state.lock();
        if let Some(pending) = state.pending(intent).clone() {
            drop(state);
            debug!(controller = self.id, request = intent.name(), "joining pending request");
            pending.forward_to(&out);
            return;
        }

        if state.pending(intent.opposite()).is_some() {
            debug!(
                controller = self.id,
                request = intent.name(),
                waiting_for = intent.opposite().name(),
                "deferring request"
            );
            state.deferred.push((intent, out));
            return;
        }

        let current = state.current;
        drop(state);

        if self.backend_reports(intent, current) {
            debug!(controller = self.id, request = intent.name(), "already in target state");
            self.apply_state(intent.target());
            out.complete(self.handle());
            return;
        }

        *self.state.lock().pending(intent) = Some(out);
        self.drive(intent);
    }

    /// Whether the backend is already where `intent` wants it.
    ///
    /// A pause issued before any transition was confirmed always reaches the
    /// backend, since a backend that is not playing yet may still be loading.
    fn backend_reports(&self, intent: Intent, current: PlaybackState) -> bool {
        let playing = self.backend.is_playing();
        match intent {
            Intent::Play => playing,
            Intent::Pause => !playing && current != PlaybackState::Initialized,
        }
    }

    fn drive(self: &Arc<Self>, intent: Intent) {
        debug!(controller = self.id, request = intent.name(), "invoking backend");
        let issued = match intent {
            Intent::Play => self.backend.play(),
            Intent::Pause => self.backend.pause(),
        };

        if let Err(err) = issued {
            self.handle_error(MediaException::from(err));
            return;
        }

        if let CompletionDetection::Polled(config) = self.detection {
            self.start_polling(intent, config);
        }
    }

    fn start_polling(self: &Arc<Self>, intent: Intent, config: PollConfig) {
        let token = CancellationToken::new();
        {
            let mut state = self.state.lock();
            state.stop_polling();
            state.poll = Some(token.clone());
        }
        let deadline = self.scheduler.now() + config.timeout;
        self.poll_tick(intent, config, deadline, token);
    }

    fn poll_tick(
        self: &Arc<Self>,
        intent: Intent,
        config: PollConfig,
        deadline: Duration,
        token: CancellationToken,
    ) {
        if token.is_cancelled() || self.state.lock().pending(intent).is_none() {
            return;
        }

        let playing = self.backend.is_playing();
        trace!(controller = self.id, request = intent.name(), playing, "poll tick");
        if playing == (intent == Intent::Play) {
            self.apply_state(intent.target());
            return;
        }

        if self.scheduler.now() >= deadline {
            self.handle_error(MediaException::new(
                MediaErrorType::Timeout,
                format!(
                    "{} was not confirmed within {:?}",
                    intent.name(),
                    config.timeout
                ),
            ));
            return;
        }

        let weak = Arc::downgrade(self);
        self.scheduler.post_after(config.interval, move || {
            if let Some(shared) = weak.upgrade() {
                shared.poll_tick(intent, config, deadline, token);
            }
        });
    }

    /// Record `new_state`, notify listeners, then settle the request it confirms.
    fn apply_state(self: &Arc<Self>, new_state: PlaybackState) {
        let previous = std::mem::replace(&mut self.state.lock().current, new_state);
        if previous != new_state {
            debug!(controller = self.id, %previous, %new_state, "state changed");
            self.fire_state_change(MediaStateChangeEvent::new(previous, new_state));
        }

        let confirmed = Intent::confirmed_by(new_state).and_then(|intent| {
            let mut state = self.state.lock();
            let request = state.pending(intent).take();
            if request.is_some() {
                state.stop_polling();
            }
            request
        });

        if let Some(request) = confirmed {
            request.complete(self.handle());
            self.resume_deferred();
        }
    }

    fn handle_error(self: &Arc<Self>, error: MediaException) {
        warn!(
            controller = self.id,
            kind = %error.kind(),
            message = error.message(),
            "media error"
        );
        self.fire_error(&MediaErrorEvent::new(error.clone()));

        let failed: Vec<MediaRequest> = {
            let mut state = self.state.lock();
            state.stop_polling();
            [state.pending_play.take(), state.pending_pause.take()]
                .into_iter()
                .flatten()
                .collect()
        };

        self.resync();
        for request in failed {
            request.error(error.clone());
        }
        self.resume_deferred();
    }

    /// Adopt whatever the backend currently reports.
    fn resync(self: &Arc<Self>) {
        let observed = if self.backend.is_playing() {
            PlaybackState::Playing
        } else {
            PlaybackState::Paused
        };
        let previous = std::mem::replace(&mut self.state.lock().current, observed);
        if previous != observed {
            debug!(controller = self.id, %previous, %observed, "state resynchronized");
            self.fire_state_change(MediaStateChangeEvent::new(previous, observed));
        }
    }

    fn resume_deferred(self: &Arc<Self>) {
        let deferred = std::mem::take(&mut self.state.lock().deferred);
        for (intent, request) in deferred {
            debug!(controller = self.id, request = intent.name(), "re-evaluating deferred request");
            self.request(intent, request);
        }
    }

    fn shutdown(self: &Arc<Self>) {
        let aborted: Vec<MediaRequest> = {
            let mut state = self.state.lock();
            state.stop_polling();
            let deferred = std::mem::take(&mut state.deferred);
            [state.pending_play.take(), state.pending_pause.take()]
                .into_iter()
                .flatten()
                .chain(deferred.into_iter().map(|(_, request)| request))
                .collect()
        };

        if !aborted.is_empty() {
            debug!(controller = self.id, aborted = aborted.len(), "aborting requests on cleanup");
        }
        let error = MediaException::new(MediaErrorType::Aborted, "media was cleaned up");
        for request in aborted {
            request.error(error.clone());
        }
        self.backend.cleanup();
    }

    fn fire_state_change(&self, event: MediaStateChangeEvent) {
        let mut dropped = false;
        self.state_listeners
            .for_each(|_, listener| match listener.upgrade() {
                Some(listener) => listener.state_changed(&event),
                None => dropped = true,
            });
        if dropped {
            self.state_listeners.retain(|listener| listener.strong_count() > 0);
        }
    }

    fn fire_error(&self, event: &MediaErrorEvent) {
        let mut dropped = false;
        self.error_listeners
            .for_each(|_, listener| match listener.upgrade() {
                Some(listener) => listener.media_error(event),
                None => dropped = true,
            });
        if dropped {
            self.error_listeners.retain(|listener| listener.strong_count() > 0);
        }
    }
}

/// Sink handed to the backend; marshals native events onto the scheduler.
struct ControllerEvents {
    shared: Weak<Shared>,
    scheduler: Scheduler,
}

impl MediaEventSink for ControllerEvents {
    fn state_changed(&self, state: PlaybackState) {
        if state == PlaybackState::Initialized {
            return;
        }
        let shared = self.shared.clone();
        self.scheduler.post(move || {
            if let Some(shared) = shared.upgrade() {
                shared.apply_state(state);
            }
        });
    }

    fn error(&self, error: MediaException) {
        let shared = self.shared.clone();
        self.scheduler.post(move || {
            if let Some(shared) = shared.upgrade() {
                shared.handle_error(error);
            }
        });
    }
}

/// [`AsyncMedia`] built from a blocking [`MediaBackend`].
///
/// Cloning is cheap and every clone controls the same backend.
#[derive(Clone)]
pub struct UnifiedMediaController {
    shared: Arc<Shared>,
}

impl UnifiedMediaController {
    /// Wrap `backend`, driving it from `scheduler`.
    ///
    /// The backend receives the controller's event sink through
    /// [`MediaBackend::attach_events`].
    pub fn new(
        backend: Arc<dyn MediaBackend>,
        detection: CompletionDetection,
        scheduler: &Scheduler,
    ) -> Self {
        let controller = Self {
            shared: Arc::new(Shared {
                id: NEXT_CONTROLLER_ID.fetch_add(1, Ordering::Relaxed),
                scheduler: scheduler.clone(),
                backend,
                detection,
                state: Mutex::new(ControllerState {
                    current: PlaybackState::Initialized,
                    pending_play: None,
                    pending_pause: None,
                    deferred: Vec::new(),
                    poll: None,
                }),
                state_listeners: DeferredList::new(),
                error_listeners: DeferredList::new(),
            }),
        };

        debug!(controller = controller.shared.id, ?detection, "wrapping media backend");
        controller.shared.backend.attach_events(controller.event_sink());
        controller
    }

    /// Sink through which platform glue reports native events. Safe to call
    /// from any thread.
    pub fn event_sink(&self) -> Arc<dyn MediaEventSink> {
        Arc::new(ControllerEvents {
            shared: Arc::downgrade(&self.shared),
            scheduler: self.shared.scheduler.clone(),
        })
    }

    pub fn detection(&self) -> CompletionDetection {
        self.shared.detection
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.shared.scheduler
    }

    pub fn backend(&self) -> &Arc<dyn MediaBackend> {
        &self.shared.backend
    }

    /// Returns `true` while a play or pause request is being driven.
    pub fn has_pending_request(&self) -> bool {
        let state = self.shared.state.lock();
        state.pending_play.is_some() || state.pending_pause.is_some()
    }

    fn submit(&self, intent: Intent) -> MediaRequest {
        let out = MediaRequest::new(&self.shared.scheduler);
        let shared = Arc::clone(&self.shared);
        let request = out.clone();
        self.shared
            .scheduler
            .post(move || shared.request(intent, request));
        out
    }
}

impl fmt::Debug for UnifiedMediaController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("UnifiedMediaController")
            .field("id", &self.shared.id)
            .field("state", &state.current)
            .field("pending_play", &state.pending_play.is_some())
            .field("pending_pause", &state.pending_pause.is_some())
            .field("deferred", &state.deferred.len())
            .field("detection", &self.shared.detection)
            .finish()
    }
}

impl AsyncMedia for UnifiedMediaController {
    fn play_async(&self) -> MediaRequest {
        self.submit(Intent::Play)
    }

    fn pause_async(&self) -> MediaRequest {
        self.submit(Intent::Pause)
    }

    fn state(&self) -> PlaybackState {
        self.shared.state.lock().current
    }

    fn add_state_change_listener(
        &self,
        listener: &Arc<dyn MediaStateChangeListener>,
    ) -> ListenerId {
        self.shared.state_listeners.add(Arc::downgrade(listener))
    }

    fn remove_state_change_listener(&self, id: ListenerId) -> bool {
        self.shared.state_listeners.remove(id)
    }

    fn add_error_listener(&self, listener: &Arc<dyn MediaErrorListener>) -> ListenerId {
        self.shared.error_listeners.add(Arc::downgrade(listener))
    }

    fn remove_error_listener(&self, id: ListenerId) -> bool {
        self.shared.error_listeners.remove(id)
    }
}

impl MediaBackend for UnifiedMediaController {
    /// Fire-and-forget [`AsyncMedia::play_async`].
    fn play(&self) -> bridge_traits::Result<()> {
        let _ = self.play_async();
        Ok(())
    }

    /// Fire-and-forget [`AsyncMedia::pause_async`].
    fn pause(&self) -> bridge_traits::Result<()> {
        let _ = self.pause_async();
        Ok(())
    }

    fn is_playing(&self) -> bool {
        self.shared.backend.is_playing()
    }

    fn time(&self) -> Duration {
        self.shared.backend.time()
    }

    fn set_time(&self, position: Duration) {
        self.shared.backend.set_time(position);
    }

    fn duration(&self) -> Option<Duration> {
        self.shared.backend.duration()
    }

    fn volume(&self) -> u8 {
        self.shared.backend.volume()
    }

    fn set_volume(&self, volume: u8) {
        self.shared.backend.set_volume(volume.min(100));
    }

    fn is_video(&self) -> bool {
        self.shared.backend.is_video()
    }

    fn is_full_screen(&self) -> bool {
        self.shared.backend.is_full_screen()
    }

    fn set_full_screen(&self, full_screen: bool) {
        self.shared.backend.set_full_screen(full_screen);
    }

    fn is_native_player_mode(&self) -> bool {
        self.shared.backend.is_native_player_mode()
    }

    fn set_native_player_mode(&self, native: bool) {
        self.shared.backend.set_native_player_mode(native);
    }

    fn video_component(&self) -> Option<VideoComponent> {
        self.shared.backend.video_component()
    }

    fn variable(&self, key: &str) -> Option<MediaVariable> {
        self.shared.backend.variable(key)
    }

    fn set_variable(&self, key: &str, value: MediaVariable) {
        self.shared.backend.set_variable(key, value);
    }

    fn prepare(&self) -> bridge_traits::Result<()> {
        self.shared.backend.prepare()
    }

    /// Stop polling, abort outstanding requests, then release the backend.
    /// Runs on the scheduler.
    fn cleanup(&self) {
        let shared = Arc::clone(&self.shared);
        self.shared.scheduler.post(move || shared.shutdown());
    }
}

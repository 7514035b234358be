//! Fake media backends shared by the integration tests.

#![allow(dead_code)]

use bridge_traits::{
    BridgeError, MediaBackend, MediaErrorType, MediaEventSink, MediaException, MediaVariable,
    PlaybackState,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// How the fake reacts to native play/pause calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    /// Nothing happens until the test emits an event or flips the state.
    Silent,
    /// The call blocks until the transition happened, then returns.
    Blocking,
    /// The transition happens on another thread, which then reports it.
    Background,
}

pub struct FakeBackend {
    behavior: Behavior,
    playing: AtomicBool,
    play_calls: AtomicUsize,
    pause_calls: AtomicUsize,
    volume: AtomicU8,
    reject: Mutex<Option<BridgeError>>,
    sink: Mutex<Option<Arc<dyn MediaEventSink>>>,
    variables: Mutex<HashMap<String, MediaVariable>>,
}

impl FakeBackend {
    pub fn new(behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            playing: AtomicBool::new(false),
            play_calls: AtomicUsize::new(0),
            pause_calls: AtomicUsize::new(0),
            volume: AtomicU8::new(50),
            reject: Mutex::new(None),
            sink: Mutex::new(None),
            variables: Mutex::new(HashMap::new()),
        })
    }

    pub fn play_calls(&self) -> usize {
        self.play_calls.load(Ordering::SeqCst)
    }

    pub fn pause_calls(&self) -> usize {
        self.pause_calls.load(Ordering::SeqCst)
    }

    pub fn set_playing(&self, playing: bool) {
        self.playing.store(playing, Ordering::SeqCst);
    }

    /// Fail the next native play/pause call with `error`.
    pub fn reject_next(&self, error: BridgeError) {
        *self.reject.lock() = Some(error);
    }

    pub fn has_sink(&self) -> bool {
        self.sink.lock().is_some()
    }

    /// Report a native state change, updating `is_playing` to match.
    pub fn emit(&self, state: PlaybackState) {
        self.set_playing(state == PlaybackState::Playing);
        if let Some(sink) = self.sink.lock().clone() {
            sink.state_changed(state);
        }
    }

    /// Report a native error.
    pub fn fail(&self, kind: MediaErrorType, message: &str) {
        if let Some(sink) = self.sink.lock().clone() {
            sink.error(MediaException::new(kind, message));
        }
    }

    fn transition(&self, playing: bool) -> bridge_traits::Result<()> {
        if let Some(error) = self.reject.lock().take() {
            return Err(error);
        }
        match self.behavior {
            Behavior::Silent => {}
            Behavior::Blocking => self.set_playing(playing),
            Behavior::Background => {
                self.set_playing(playing);
                let sink = self.sink.lock().clone();
                let state = if playing {
                    PlaybackState::Playing
                } else {
                    PlaybackState::Paused
                };
                thread::spawn(move || {
                    thread::sleep(Duration::from_millis(5));
                    if let Some(sink) = sink {
                        sink.state_changed(state);
                    }
                });
            }
        }
        Ok(())
    }
}

impl MediaBackend for FakeBackend {
    fn play(&self) -> bridge_traits::Result<()> {
        self.play_calls.fetch_add(1, Ordering::SeqCst);
        self.transition(true)
    }

    fn pause(&self) -> bridge_traits::Result<()> {
        self.pause_calls.fetch_add(1, Ordering::SeqCst);
        self.transition(false)
    }

    fn is_playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }

    fn time(&self) -> Duration {
        Duration::from_millis(1_500)
    }

    fn set_time(&self, _position: Duration) {}

    fn duration(&self) -> Option<Duration> {
        Some(Duration::from_secs(200))
    }

    fn volume(&self) -> u8 {
        self.volume.load(Ordering::SeqCst)
    }

    fn set_volume(&self, volume: u8) {
        self.volume.store(volume, Ordering::SeqCst);
    }

    fn variable(&self, key: &str) -> Option<MediaVariable> {
        self.variables.lock().get(key).cloned()
    }

    fn set_variable(&self, key: &str, value: MediaVariable) {
        self.variables.lock().insert(key.to_string(), value);
    }

    fn attach_events(&self, sink: Arc<dyn MediaEventSink>) {
        *self.sink.lock() = Some(sink);
    }
}

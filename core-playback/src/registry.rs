//! # Media Registry
//!
//! Entry point of the media core. A registry:
//!
//! - turns backends into [`AsyncMedia`] handles, wrapping blocking ones in a
//!   [`UnifiedMediaController`];
//! - owns a reference-counted map of named [`AudioBuffer`]s;
//! - owns the single remote-control listener slot and starts/stops the
//!   platform [`RemoteControlService`] as the slot fills and empties.
//!
//! Registries are ordinary values so tests can build isolated ones;
//! [`MediaRegistry::global`] is the process-wide default.
//!
//! ## Audio buffer reference counting
//!
//! Every successful `get_audio_buffer*` call counts as one reference and
//! must be balanced by [`release_audio_buffer`]. The entry disappears when
//! the count reaches zero, after which the same name yields a new buffer.
//! [`delete_audio_buffer`] removes the entry no matter how many references
//! are outstanding; holders keep a working buffer, but it is no longer
//! reachable by name. Their references are still owed: releases of that name
//! settle them first and never touch a buffer created under the same name
//! afterwards. Holders that may outlive a delete can release by identity
//! with [`release_audio_buffer_instance`].
//!
//! [`release_audio_buffer`]: MediaRegistry::release_audio_buffer
//! [`delete_audio_buffer`]: MediaRegistry::delete_audio_buffer
//! [`release_audio_buffer_instance`]: MediaRegistry::release_audio_buffer_instance

use crate::audio_buffer::AudioBuffer;
use crate::controller::UnifiedMediaController;
use crate::detection::CompletionDetection;
use crate::error::{PlaybackError, Result};
use crate::media::{AsyncMedia, Backend};
use crate::remote::{ListenerSlot, RemoteControlRelay};
use bridge_traits::{RemoteControlListener, RemoteControlService};
use core_async::{Scheduler, SchedulerThread};
use core_runtime::config::{CoreConfig, DEFAULT_AUDIO_BUFFER_CAPACITY};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};
use tracing::{debug, error, info, warn};

static GLOBAL_REGISTRY: OnceLock<MediaRegistry> = OnceLock::new();

struct BufferEntry {
    buffer: Arc<AudioBuffer>,
    refs: usize,
}

#[derive(Default)]
struct AudioBuffers {
    live: HashMap<String, BufferEntry>,
    /// References to deleted buffers not yet released, by name.
    orphaned: HashMap<String, usize>,
}

impl AudioBuffers {
    fn release_live(&mut self, name: &str) -> bool {
        let Some(entry) = self.live.get_mut(name) else {
            return false;
        };

        entry.refs -= 1;
        if entry.refs == 0 {
            self.live.remove(name);
            debug!(buffer = name, "audio buffer destroyed");
        } else {
            debug!(buffer = name, refs = entry.refs, "audio buffer released");
        }
        true
    }

    fn release_orphaned(&mut self, name: &str) -> bool {
        let Some(refs) = self.orphaned.get_mut(name) else {
            return false;
        };

        *refs -= 1;
        debug!(buffer = name, remaining = *refs, "deleted audio buffer released");
        if *refs == 0 {
            self.orphaned.remove(name);
        }
        true
    }
}

pub struct MediaRegistry {
    scheduler: Scheduler,
    default_detection: CompletionDetection,
    default_buffer_capacity: usize,
    audio_buffers: Mutex<AudioBuffers>,
    /// Serializes listener changes so the service starts and stops exactly once.
    remote_lifecycle: Mutex<()>,
    remote_listener: ListenerSlot,
    remote_service: Option<Arc<dyn RemoteControlService>>,
    _driver: Option<SchedulerThread>,
}

impl MediaRegistry {
    /// Registry driving controllers from `scheduler`, with default settings
    /// and no remote-control service.
    pub fn new(scheduler: Scheduler) -> Self {
        Self {
            scheduler,
            default_detection: CompletionDetection::default(),
            default_buffer_capacity: DEFAULT_AUDIO_BUFFER_CAPACITY,
            audio_buffers: Mutex::new(AudioBuffers::default()),
            remote_lifecycle: Mutex::new(()),
            remote_listener: Arc::new(RwLock::new(None)),
            remote_service: None,
            _driver: None,
        }
    }

    /// Registry configured from `config`.
    pub fn from_config(config: &CoreConfig, scheduler: Scheduler) -> Result<Self> {
        config.validate()?;
        let mut registry = Self::new(scheduler);
        registry.default_detection = CompletionDetection::from_config(config);
        registry.default_buffer_capacity = config.default_audio_buffer_capacity;
        registry.remote_service = config.remote_control_service.clone();
        Ok(registry)
    }

    pub fn with_remote_control_service(mut self, service: Arc<dyn RemoteControlService>) -> Self {
        self.remote_service = Some(service);
        self
    }

    pub fn with_default_detection(mut self, detection: CompletionDetection) -> Self {
        self.default_detection = detection;
        self
    }

    /// The process-wide registry, created on first use with its scheduler
    /// running on a dedicated thread.
    pub fn global() -> &'static MediaRegistry {
        GLOBAL_REGISTRY.get_or_init(|| {
            let scheduler = Scheduler::new();
            let driver = match scheduler.start() {
                Ok(driver) => Some(driver),
                Err(err) => {
                    // Blocking waits still make progress by pumping the loop.
                    error!(error = %err, "failed to start media scheduler thread");
                    None
                }
            };
            let mut registry = MediaRegistry::new(scheduler);
            registry._driver = driver;
            registry
        })
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn default_detection(&self) -> CompletionDetection {
        self.default_detection
    }

    // ========================================================================
    // Media
    // ========================================================================

    /// Asynchronous handle for `backend`.
    ///
    /// Asynchronous backends come back unchanged. Each call with a
    /// synchronous backend creates a new controller, so wrap once and keep
    /// the handle.
    pub fn get_async_media(&self, backend: Backend) -> Arc<dyn AsyncMedia> {
        match backend {
            Backend::Async(media) => media,
            Backend::Sync { backend, detection } => {
                let detection = detection.unwrap_or(self.default_detection);
                Arc::new(UnifiedMediaController::new(
                    backend,
                    detection,
                    &self.scheduler,
                ))
            }
        }
    }

    // ========================================================================
    // Audio buffers
    // ========================================================================

    /// Existing buffer `name`, or a new one of `capacity` samples when
    /// `create` is set. Counts as one reference either way.
    ///
    /// The capacity of an existing buffer is left unchanged.
    pub fn get_audio_buffer_with(
        &self,
        name: &str,
        create: bool,
        capacity: usize,
    ) -> Result<Arc<AudioBuffer>> {
        let mut buffers = self.audio_buffers.lock();
        if let Some(entry) = buffers.live.get_mut(name) {
            entry.refs += 1;
            debug!(buffer = name, refs = entry.refs, "audio buffer retained");
            return Ok(Arc::clone(&entry.buffer));
        }

        if !create {
            return Err(PlaybackError::AudioBufferNotFound(name.to_string()));
        }

        let buffer = Arc::new(AudioBuffer::new(capacity)?);
        buffers.live.insert(
            name.to_string(),
            BufferEntry {
                buffer: Arc::clone(&buffer),
                refs: 1,
            },
        );
        debug!(buffer = name, capacity, "audio buffer created");
        Ok(buffer)
    }

    /// Existing buffer `name`.
    pub fn get_audio_buffer(&self, name: &str) -> Result<Arc<AudioBuffer>> {
        self.get_audio_buffer_with(name, false, self.default_buffer_capacity)
    }

    /// Buffer `name`, created with the default capacity if absent.
    pub fn get_or_create_audio_buffer(&self, name: &str) -> Result<Arc<AudioBuffer>> {
        self.get_audio_buffer_with(name, true, self.default_buffer_capacity)
    }

    /// Drop one reference to `name`. Returns `false` if there was no such buffer.
    ///
    /// References to a deleted buffer of that name are settled before the
    /// current buffer is touched.
    pub fn release_audio_buffer(&self, name: &str) -> bool {
        let mut buffers = self.audio_buffers.lock();
        buffers.release_orphaned(name) || buffers.release_live(name)
    }

    /// Drop one reference to `buffer`, obtained under `name`.
    ///
    /// Only the entry `buffer` belongs to is affected: if it was deleted and
    /// the name since reused, the new buffer keeps all its references.
    pub fn release_audio_buffer_instance(&self, name: &str, buffer: &Arc<AudioBuffer>) -> bool {
        let mut buffers = self.audio_buffers.lock();
        let current = buffers
            .live
            .get(name)
            .is_some_and(|entry| Arc::ptr_eq(&entry.buffer, buffer));

        if current {
            buffers.release_live(name)
        } else {
            buffers.release_orphaned(name)
        }
    }

    /// Remove `name` regardless of outstanding references.
    pub fn delete_audio_buffer(&self, name: &str) -> bool {
        let mut buffers = self.audio_buffers.lock();
        let Some(entry) = buffers.live.remove(name) else {
            return false;
        };

        warn!(
            buffer = name,
            refs = entry.refs,
            "deleting audio buffer with outstanding references"
        );
        *buffers.orphaned.entry(name.to_string()).or_default() += entry.refs;
        true
    }

    pub fn audio_buffer_ref_count(&self, name: &str) -> usize {
        self.audio_buffers
            .lock()
            .live
            .get(name)
            .map_or(0, |entry| entry.refs)
    }

    pub fn has_audio_buffer(&self, name: &str) -> bool {
        self.audio_buffers.lock().live.contains_key(name)
    }

    // ========================================================================
    // Remote control
    // ========================================================================

    /// Install or clear the remote-control listener.
    ///
    /// Filling an empty slot starts the remote-control service, emptying it
    /// stops the service, and replacing one listener with another leaves the
    /// service alone. If the service fails to start the slot stays empty; if
    /// it fails to stop the previous listener stays installed.
    pub fn set_remote_control_listener(
        &self,
        listener: Option<Arc<dyn RemoteControlListener>>,
    ) -> Result<()> {
        let _lifecycle = self.remote_lifecycle.lock();
        let was_active = self.remote_listener.read().is_some();

        match (was_active, listener) {
            (false, Some(listener)) => {
                *self.remote_listener.write() = Some(listener);
                if let Some(service) = &self.remote_service {
                    if let Err(err) = service.start() {
                        *self.remote_listener.write() = None;
                        return Err(err.into());
                    }
                    info!("remote control service started");
                }
            }
            (true, Some(listener)) => {
                *self.remote_listener.write() = Some(listener);
                debug!("remote control listener replaced");
            }
            (true, None) => {
                if let Some(service) = &self.remote_service {
                    service.stop()?;
                    info!("remote control service stopped");
                }
                *self.remote_listener.write() = None;
            }
            (false, None) => {}
        }
        Ok(())
    }

    pub fn remote_control_listener(&self) -> Option<Arc<dyn RemoteControlListener>> {
        self.remote_listener.read().clone()
    }

    /// Relay the platform remote-control surface should deliver commands to.
    pub fn remote_control(&self) -> RemoteControlRelay {
        RemoteControlRelay::new(Arc::clone(&self.remote_listener))
    }
}

impl fmt::Debug for MediaRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let buffers: Vec<String> = self.audio_buffers.lock().live.keys().cloned().collect();
        f.debug_struct("MediaRegistry")
            .field("default_detection", &self.default_detection)
            .field("default_buffer_capacity", &self.default_buffer_capacity)
            .field("audio_buffers", &buffers)
            .field("remote_listener", &self.remote_listener.read().is_some())
            .field("remote_service", &self.remote_service.is_some())
            .finish_non_exhaustive()
    }
}

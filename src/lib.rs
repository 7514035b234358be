//! Workspace facade crate.
//!
//! Re-exports the public surface of the member crates so host applications can
//! depend on a single crate:
//!
//! - [`core_async`]: the single logical scheduler and the `AsyncResult` promise
//! - [`bridge_traits`]: contracts implemented by platform media backends
//! - [`core_runtime`]: configuration and logging
//! - [`core_playback`]: the unified media controller, audio buffers and registry

pub use bridge_traits;
pub use core_async;
pub use core_playback;
pub use core_runtime;

pub use bridge_traits::{
    MediaBackend, MediaErrorType, MediaEventSink, MediaException, PlaybackState,
    RemoteControlListener, RemoteControlService,
};
pub use core_async::{AsyncResult, ExecutionError, Scheduler};
pub use core_playback::{
    AsyncMedia, AudioBuffer, Backend, CompletionDetection, MediaRegistry, PollConfig,
    UnifiedMediaController,
};
pub use core_runtime::{CoreConfig, LoggingConfig};

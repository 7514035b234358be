//! Synchronization primitives.
//!
//! The scheduler and promises mix two kinds of waiting:
//! - blocking waits from plain threads, served by `parking_lot` locks and
//!   condition variables
//! - async waits from Tokio tasks, served by `tokio::sync::Notify`
//!
//! Cancellation of long-running loops (the scheduler driver, media poll
//! loops) goes through `tokio_util`'s [`CancellationToken`].

pub use parking_lot::{Condvar, Mutex, MutexGuard, ReentrantMutex};
pub use tokio::sync::{oneshot, Notify};
pub use tokio_util::sync::CancellationToken;

//! Runtime abstraction layer for the media core.
//!
//! Every state mutation in the media core happens on one logical thread: the
//! [`Scheduler`], a cooperative event loop with timers. Asynchronous outcomes
//! are carried by [`AsyncResult`], a one-shot promise whose continuations are
//! always delivered through that scheduler.
//!
//! # Modules
//!
//! - `scheduler`: the event loop, its timers and its driver thread
//! - `promise`: `AsyncResult` and `ExecutionError`
//! - `time`: injectable monotonic clocks plus Tokio time re-exports
//! - `sync`: synchronization primitives used by the scheduler and promises
//! - `runtime`: helpers for driving futures on a private runtime
//!
//! # Examples
//!
//! ```rust
//! use core_async::{AsyncResult, Scheduler};
//!
//! let scheduler = Scheduler::new();
//! let result: AsyncResult<u32, String> = AsyncResult::new(&scheduler);
//!
//! result.ready(|value| assert_eq!(value, 42));
//! result.complete(42);
//!
//! // Continuations run on the next scheduler turn.
//! scheduler.run_until_idle();
//! assert_eq!(result.get().unwrap(), 42);
//! ```

pub mod promise;
pub mod runtime;
pub mod scheduler;
pub mod sync;
pub mod time;

pub use promise::{AsyncResult, ExecutionError};
pub use scheduler::{Scheduler, SchedulerThread};
pub use time::{Clock, Duration, ManualClock, SystemClock};

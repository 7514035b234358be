//! Runtime utilities that abstract over the underlying async executor.
//!
//! Downstream crates never build Tokio runtimes themselves; the scheduler
//! driver thread uses [`block_on`] to run its loop on a private
//! current-thread runtime.

use std::future::Future;
use std::io;

pub use tokio::runtime::{Builder, Handle, Runtime};

/// Runs the provided future to completion on a fresh current-thread runtime.
///
/// Returns an error when the runtime cannot be built (for example when the
/// I/O driver cannot be initialised).
pub fn block_on<F>(future: F) -> io::Result<F::Output>
where
    F: Future,
{
    let runtime = Builder::new_current_thread().enable_all().build()?;
    Ok(runtime.block_on(future))
}

/// Returns `true` when called from inside a Tokio runtime context.
pub fn in_runtime() -> bool {
    Handle::try_current().is_ok()
}

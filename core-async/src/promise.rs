//! One-shot promises delivered through the scheduler.
//!
//! An [`AsyncResult`] starts pending and settles exactly once, either with a
//! value ([`AsyncResult::complete`]) or a failure ([`AsyncResult::error`]).
//! Later attempts to settle it are ignored.
//!
//! Continuations registered with [`ready`](AsyncResult::ready),
//! [`except`](AsyncResult::except) or [`on_result`](AsyncResult::on_result)
//! never run inline. They are posted to the owning [`Scheduler`] and fire in
//! registration order, whether they were registered before or after the
//! result settled.
//!
//! Blocking retrieval with [`get`](AsyncResult::get) wraps a failure in
//! [`ExecutionError::Failed`]; `except` continuations receive the failure
//! itself.

use crate::scheduler::Scheduler;
use crate::sync::{Condvar, Mutex, Notify};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Error returned when waiting on an [`AsyncResult`].
#[derive(Debug, Clone, Error)]
pub enum ExecutionError<E> {
    /// The result failed; `cause` is the original failure.
    #[error("asynchronous execution failed: {cause}")]
    Failed {
        #[source]
        cause: E,
    },

    /// A bounded wait gave up before the result settled.
    #[error("timed out after {0:?} waiting for an asynchronous result")]
    TimedOut(Duration),
}

impl<E> ExecutionError<E> {
    /// The original failure, if the result failed.
    pub fn cause(&self) -> Option<&E> {
        match self {
            ExecutionError::Failed { cause } => Some(cause),
            ExecutionError::TimedOut(_) => None,
        }
    }

    pub fn into_cause(self) -> Option<E> {
        match self {
            ExecutionError::Failed { cause } => Some(cause),
            ExecutionError::TimedOut(_) => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ExecutionError::TimedOut(_))
    }
}

enum Continuation<T, E> {
    Ready(Box<dyn FnOnce(T) + Send>),
    Except(Box<dyn FnOnce(E) + Send>),
    Settled(Box<dyn FnOnce(Result<T, E>) + Send>),
}

impl<T: Clone, E: Clone> Continuation<T, E> {
    fn invoke(self, outcome: &Result<T, E>) {
        match (self, outcome) {
            (Continuation::Ready(callback), Ok(value)) => callback(value.clone()),
            (Continuation::Except(callback), Err(cause)) => callback(cause.clone()),
            (Continuation::Settled(callback), outcome) => callback(outcome.clone()),
            _ => {}
        }
    }
}

struct State<T, E> {
    outcome: Option<Result<T, E>>,
    continuations: Vec<Continuation<T, E>>,
}

struct Shared<T, E> {
    scheduler: Scheduler,
    state: Mutex<State<T, E>>,
    settled: Condvar,
    notify: Notify,
}

/// Handle to a one-shot asynchronous outcome. Clones share the same result.
pub struct AsyncResult<T, E> {
    shared: Arc<Shared<T, E>>,
}

impl<T, E> Clone for AsyncResult<T, E> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T, E> fmt::Debug for AsyncResult<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.lock();
        let status = match &state.outcome {
            None => "pending",
            Some(Ok(_)) => "completed",
            Some(Err(_)) => "failed",
        };
        f.debug_struct("AsyncResult")
            .field("status", &status)
            .field("continuations", &state.continuations.len())
            .finish()
    }
}

impl<T, E> AsyncResult<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    /// Create a pending result whose continuations run on `scheduler`.
    pub fn new(scheduler: &Scheduler) -> Self {
        Self {
            shared: Arc::new(Shared {
                scheduler: scheduler.clone(),
                state: Mutex::new(State {
                    outcome: None,
                    continuations: Vec::new(),
                }),
                settled: Condvar::new(),
                notify: Notify::new(),
            }),
        }
    }

    /// Create a result that has already completed with `value`.
    pub fn completed(scheduler: &Scheduler, value: T) -> Self {
        let result = Self::new(scheduler);
        result.complete(value);
        result
    }

    /// Create a result that has already failed with `cause`.
    pub fn failed(scheduler: &Scheduler, cause: E) -> Self {
        let result = Self::new(scheduler);
        result.error(cause);
        result
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.shared.scheduler
    }

    /// Returns `true` if both handles refer to the same result.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    /// Run `callback` with the value once the result completes.
    pub fn ready<F>(&self, callback: F) -> &Self
    where
        F: FnOnce(T) + Send + 'static,
    {
        self.register(Continuation::Ready(Box::new(callback)))
    }

    /// Run `callback` with the failure once the result fails.
    pub fn except<F>(&self, callback: F) -> &Self
    where
        F: FnOnce(E) + Send + 'static,
    {
        self.register(Continuation::Except(Box::new(callback)))
    }

    /// Run `callback` with the outcome, whichever way the result settles.
    pub fn on_result<F>(&self, callback: F) -> &Self
    where
        F: FnOnce(Result<T, E>) + Send + 'static,
    {
        self.register(Continuation::Settled(Box::new(callback)))
    }

    fn register(&self, continuation: Continuation<T, E>) -> &Self {
        let mut state = self.shared.state.lock();
        match &state.outcome {
            None => state.continuations.push(continuation),
            Some(outcome) => {
                let outcome = outcome.clone();
                // Posted under the state lock so that a concurrent settle
                // cannot reorder its batch behind this continuation.
                self.shared
                    .scheduler
                    .post(move || continuation.invoke(&outcome));
            }
        }
        self
    }

    /// Complete with `value`. Returns `false` if the result had already settled.
    pub fn complete(&self, value: T) -> bool {
        self.settle(Ok(value))
    }

    /// Fail with `cause`. Returns `false` if the result had already settled.
    pub fn error(&self, cause: E) -> bool {
        self.settle(Err(cause))
    }

    fn settle(&self, outcome: Result<T, E>) -> bool {
        {
            let mut state = self.shared.state.lock();
            if state.outcome.is_some() {
                return false;
            }
            state.outcome = Some(outcome.clone());
            let continuations = std::mem::take(&mut state.continuations);
            if !continuations.is_empty() {
                self.shared.scheduler.post(move || {
                    for continuation in continuations {
                        continuation.invoke(&outcome);
                    }
                });
            }
        }
        self.shared.settled.notify_all();
        self.shared.notify.notify_waiters();
        true
    }

    /// Settle `target` with this result's outcome, unless `target` settles first.
    pub fn forward_to(&self, target: &AsyncResult<T, E>) -> &Self {
        let target = target.clone();
        self.on_result(move |outcome| {
            if target.is_done() {
                return;
            }
            match outcome {
                Ok(value) => target.complete(value),
                Err(cause) => target.error(cause),
            };
        })
    }

    /// Returns `true` once the result has completed or failed.
    pub fn is_done(&self) -> bool {
        self.shared.state.lock().outcome.is_some()
    }

    /// Returns `true` if the result completed successfully.
    pub fn is_ready(&self) -> bool {
        matches!(self.shared.state.lock().outcome, Some(Ok(_)))
    }

    /// The value, if the result completed successfully.
    pub fn value(&self) -> Option<T> {
        match &self.shared.state.lock().outcome {
            Some(Ok(value)) => Some(value.clone()),
            _ => None,
        }
    }

    /// The failure, if the result failed.
    pub fn failure(&self) -> Option<E> {
        match &self.shared.state.lock().outcome {
            Some(Err(cause)) => Some(cause.clone()),
            _ => None,
        }
    }

    fn peek(&self) -> Option<Result<T, E>> {
        self.shared.state.lock().outcome.clone()
    }

    /// Block until the result settles.
    ///
    /// When called from a scheduler job, or while no driver runs the
    /// scheduler, the calling thread pumps scheduler turns while it waits so
    /// that the outcome can still be produced.
    pub fn get(&self) -> Result<T, ExecutionError<E>> {
        self.wait_blocking(None)
    }

    /// Block until the result settles or `timeout` elapses.
    pub fn get_timeout(&self, timeout: Duration) -> Result<T, ExecutionError<E>> {
        self.wait_blocking(Some(timeout))
    }

    fn wait_blocking(&self, timeout: Option<Duration>) -> Result<T, ExecutionError<E>> {
        let deadline = timeout.map(|t| Instant::now() + t);
        let expired = || deadline.is_some_and(|d| Instant::now() >= d);
        let scheduler = &self.shared.scheduler;

        if scheduler.is_current() || !scheduler.is_driven() {
            scheduler.run_until(|| self.is_done() || expired());
        } else {
            let mut state = self.shared.state.lock();
            while state.outcome.is_none() {
                match deadline {
                    Some(deadline) => {
                        if self
                            .shared
                            .settled
                            .wait_until(&mut state, deadline)
                            .timed_out()
                        {
                            break;
                        }
                    }
                    None => self.shared.settled.wait(&mut state),
                }
            }
        }

        match self.peek() {
            Some(Ok(value)) => Ok(value),
            Some(Err(cause)) => Err(ExecutionError::Failed { cause }),
            None => Err(ExecutionError::TimedOut(timeout.unwrap_or_default())),
        }
    }

    /// Wait for the result without blocking the calling task.
    ///
    /// The scheduler must be driven by someone else (see
    /// [`Scheduler::start`]) if producing the outcome requires scheduler turns.
    pub async fn wait(&self) -> Result<T, ExecutionError<E>> {
        loop {
            let notified = self.shared.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(outcome) = self.peek() {
                return outcome.map_err(|cause| ExecutionError::Failed { cause });
            }
            notified.await;
        }
    }

    /// A result that completes once every input completes, or fails with the
    /// first failure.
    pub fn all<I>(scheduler: &Scheduler, results: I) -> AsyncResult<(), E>
    where
        I: IntoIterator<Item = AsyncResult<T, E>>,
    {
        let out = AsyncResult::new(scheduler);
        let results: Vec<_> = results.into_iter().collect();
        if results.is_empty() {
            out.complete(());
            return out;
        }

        let remaining = Arc::new(AtomicUsize::new(results.len()));
        for result in results {
            let out = out.clone();
            let remaining = Arc::clone(&remaining);
            result.on_result(move |outcome| match outcome {
                Ok(_) => {
                    if remaining.fetch_sub(1, Ordering::AcqRel) == 1 {
                        out.complete(());
                    }
                }
                Err(cause) => {
                    out.error(cause);
                }
            });
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    type TestResult = AsyncResult<u32, String>;

    fn log() -> Arc<StdMutex<Vec<String>>> {
        Arc::new(StdMutex::new(Vec::new()))
    }

    #[test]
    fn continuations_fire_on_next_turn() {
        let scheduler = Scheduler::new();
        let result = TestResult::new(&scheduler);
        let seen = log();

        let sink = seen.clone();
        result.ready(move |v| sink.lock().unwrap().push(format!("ready {v}")));
        result.complete(7);

        assert!(seen.lock().unwrap().is_empty());
        scheduler.run_until_idle();
        assert_eq!(*seen.lock().unwrap(), vec!["ready 7"]);
    }

    #[test]
    fn second_settle_is_ignored() {
        let scheduler = Scheduler::new();
        let result = TestResult::new(&scheduler);

        assert!(result.complete(1));
        assert!(!result.complete(2));
        assert!(!result.error("late".into()));
        assert_eq!(result.value(), Some(1));
        assert_eq!(result.failure(), None);
    }

    #[test]
    fn registration_order_spans_completion() {
        let scheduler = Scheduler::new();
        let result = TestResult::new(&scheduler);
        let seen = log();

        let sink = seen.clone();
        result.ready(move |_| sink.lock().unwrap().push("before-1".into()));
        let sink = seen.clone();
        result.on_result(move |_| sink.lock().unwrap().push("before-2".into()));

        result.complete(3);

        let sink = seen.clone();
        result.ready(move |_| sink.lock().unwrap().push("after-1".into()));
        let sink = seen.clone();
        result.except(move |_| sink.lock().unwrap().push("never".into()));
        let sink = seen.clone();
        result.ready(move |_| sink.lock().unwrap().push("after-2".into()));

        scheduler.run_until_idle();
        assert_eq!(
            *seen.lock().unwrap(),
            vec!["before-1", "before-2", "after-1", "after-2"]
        );

        // Nothing fires twice.
        scheduler.run_until_idle();
        assert_eq!(seen.lock().unwrap().len(), 4);
    }

    #[test]
    fn except_receives_raw_cause() {
        let scheduler = Scheduler::new();
        let result = TestResult::new(&scheduler);
        let seen = log();

        let sink = seen.clone();
        result
            .ready(|_| panic!("must not complete"))
            .except(move |cause| sink.lock().unwrap().push(cause));
        result.error("boom".into());
        scheduler.run_until_idle();

        assert_eq!(*seen.lock().unwrap(), vec!["boom"]);
    }

    #[test]
    fn get_wraps_failure() {
        let scheduler = Scheduler::new();
        let result = TestResult::failed(&scheduler, "broken".into());

        let err = result.get().unwrap_err();
        assert_eq!(err.cause().map(String::as_str), Some("broken"));
        assert!(!err.is_timeout());
        assert!(err.to_string().contains("broken"));
    }

    #[test]
    fn get_pumps_undriven_scheduler() {
        let scheduler = Scheduler::new();
        let source = TestResult::new(&scheduler);
        let target = TestResult::new(&scheduler);
        source.forward_to(&target);

        let producer = source.clone();
        scheduler.post(move || {
            producer.complete(11);
        });

        // Both the producing job and the forwarding continuation need turns.
        assert_eq!(target.get().unwrap(), 11);
    }

    #[test]
    fn get_timeout_expires() {
        let scheduler = Scheduler::new();
        let result = TestResult::new(&scheduler);

        let err = result.get_timeout(Duration::from_millis(20)).unwrap_err();
        assert!(err.is_timeout());
        assert!(!result.is_done());
    }

    #[test]
    fn get_blocks_until_driver_settles() {
        let scheduler = Scheduler::new();
        let _driver = scheduler.start().unwrap();
        let result = TestResult::new(&scheduler);

        let producer = result.clone();
        scheduler.post_after(Duration::from_millis(10), move || {
            producer.complete(5);
        });
        assert_eq!(result.get().unwrap(), 5);
    }

    #[test]
    fn forward_to_skips_settled_target() {
        let scheduler = Scheduler::new();
        let source = TestResult::new(&scheduler);
        let target = TestResult::new(&scheduler);

        source.forward_to(&target);
        target.complete(1);
        source.error("ignored".into());
        scheduler.run_until_idle();

        assert_eq!(target.value(), Some(1));
    }

    #[test]
    fn all_completes_when_every_input_completes() {
        let scheduler = Scheduler::new();
        let a = TestResult::new(&scheduler);
        let b = TestResult::new(&scheduler);
        let combined = TestResult::all(&scheduler, [a.clone(), b.clone()]);

        a.complete(1);
        scheduler.run_until_idle();
        assert!(!combined.is_done());

        b.complete(2);
        scheduler.run_until_idle();
        assert!(combined.is_ready());
    }

    #[test]
    fn all_fails_with_first_failure() {
        let scheduler = Scheduler::new();
        let a = TestResult::new(&scheduler);
        let b = TestResult::new(&scheduler);
        let combined = TestResult::all(&scheduler, [a.clone(), b.clone()]);

        b.error("first".into());
        a.error("second".into());
        scheduler.run_until_idle();

        assert_eq!(combined.failure().as_deref(), Some("first"));
    }

    #[test]
    fn all_of_nothing_is_complete() {
        let scheduler = Scheduler::new();
        let combined = TestResult::all(&scheduler, Vec::new());
        assert!(combined.is_ready());
    }

    #[tokio::test]
    async fn wait_resolves_without_blocking() {
        let scheduler = Scheduler::new();
        let result = TestResult::new(&scheduler);

        let producer = result.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            producer.complete(9);
        });

        assert_eq!(result.wait().await.unwrap(), 9);
    }
}

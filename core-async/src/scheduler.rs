//! The single logical scheduler.
//!
//! A [`Scheduler`] is a cooperative event loop. Jobs are posted from any
//! thread, but they run one at a time, in posting order, on whichever thread
//! is currently turning the loop. That thread is either:
//!
//! - the driver thread started with [`Scheduler::start`], or
//! - a caller pumping the loop explicitly with [`Scheduler::turn`],
//!   [`Scheduler::run_until_idle`] or [`Scheduler::run_until`] (tests, and
//!   blocking waits issued while no driver is running).
//!
//! Jobs never overlap: a turn holds a re-entrant turn lock, so a job may pump
//! nested turns itself (a blocking wait issued from inside a job), while
//! other threads wait for the current job to finish.
//!
//! Timers are kept against an injectable [`Clock`]. Timers sharing a deadline
//! fire in the order they were scheduled; ready jobs always run before due
//! timers.
//!
//! ```rust
//! use core_async::scheduler::Scheduler;
//! use core_async::time::{Duration, ManualClock};
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//!
//! let clock = Arc::new(ManualClock::new());
//! let scheduler = Scheduler::with_clock(clock.clone());
//! let fired = Arc::new(AtomicUsize::new(0));
//!
//! let counter = fired.clone();
//! scheduler.post_after(Duration::from_millis(50), move || {
//!     counter.fetch_add(1, Ordering::SeqCst);
//! });
//!
//! scheduler.run_until_idle();
//! assert_eq!(fired.load(Ordering::SeqCst), 0);
//!
//! clock.advance(Duration::from_millis(50));
//! scheduler.run_until_idle();
//! assert_eq!(fired.load(Ordering::SeqCst), 1);
//! ```

use crate::runtime;
use crate::sync::{CancellationToken, Condvar, Mutex, Notify, ReentrantMutex};
use crate::time::{self, Clock, Duration, SystemClock};
use std::cell::Cell;
use std::cmp::Ordering as CmpOrdering;
use std::collections::{BinaryHeap, VecDeque};
use std::fmt;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, error, trace};

/// Upper bound on a single idle wait while pumping; keeps blocking waits
/// responsive to clocks that are advanced from other threads.
const MAX_IDLE_WAIT: Duration = Duration::from_millis(10);

/// How long the driver parks when there is neither work nor a pending timer.
const DRIVER_IDLE_PARK: Duration = Duration::from_secs(1);

static NEXT_SCHEDULER_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static CURRENT_SCHEDULER: Cell<u64> = const { Cell::new(0) };
}

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Marks the calling thread as turning a scheduler until dropped, even if
/// the job panics.
struct CurrentGuard {
    previous: u64,
}

impl CurrentGuard {
    fn enter(id: u64) -> Self {
        let previous = CURRENT_SCHEDULER.with(|current| current.replace(id));
        Self { previous }
    }
}

impl Drop for CurrentGuard {
    fn drop(&mut self) {
        CURRENT_SCHEDULER.with(|current| current.set(self.previous));
    }
}

struct TimerEntry {
    deadline: Duration,
    seq: u64,
    job: Job,
}

impl PartialEq for TimerEntry {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.seq == other.seq
    }
}

impl Eq for TimerEntry {}

impl PartialOrd for TimerEntry {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimerEntry {
    // BinaryHeap is a max-heap: the earliest deadline (then lowest seq) must
    // compare greatest.
    fn cmp(&self, other: &Self) -> CmpOrdering {
        other
            .deadline
            .cmp(&self.deadline)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

#[derive(Default)]
struct Queues {
    ready: VecDeque<Job>,
    timers: BinaryHeap<TimerEntry>,
    next_seq: u64,
}

struct Inner {
    id: u64,
    clock: Arc<dyn Clock>,
    queues: Mutex<Queues>,
    posted: Condvar,
    wake: Notify,
    turn: ReentrantMutex<()>,
    driven: AtomicBool,
}

/// Handle to a single logical scheduler. Clones share the same loop.
#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<Inner>,
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let queues = self.inner.queues.lock();
        f.debug_struct("Scheduler")
            .field("id", &self.inner.id)
            .field("ready", &queues.ready.len())
            .field("timers", &queues.timers.len())
            .field("driven", &self.is_driven())
            .finish()
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    /// Create a scheduler timed by the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock::new()))
    }

    /// Create a scheduler timed by the given clock.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(Inner {
                id: NEXT_SCHEDULER_ID.fetch_add(1, Ordering::Relaxed),
                clock,
                queues: Mutex::new(Queues::default()),
                posted: Condvar::new(),
                wake: Notify::new(),
                turn: ReentrantMutex::new(()),
                driven: AtomicBool::new(false),
            }),
        }
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.inner.clock
    }

    /// Current reading of the scheduler's clock.
    pub fn now(&self) -> Duration {
        self.inner.clock.now()
    }

    /// Returns `true` if both handles refer to the same loop.
    pub fn same_as(&self, other: &Scheduler) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Enqueue a job for a future turn.
    pub fn post<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.inner.queues.lock().ready.push_back(Box::new(job));
        self.wake();
    }

    /// Enqueue a job that becomes runnable once `delay` has elapsed on the
    /// scheduler's clock.
    pub fn post_after<F>(&self, delay: Duration, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let deadline = self.now().saturating_add(delay);
        {
            let mut queues = self.inner.queues.lock();
            let seq = queues.next_seq;
            queues.next_seq += 1;
            queues.timers.push(TimerEntry {
                deadline,
                seq,
                job: Box::new(job),
            });
        }
        self.wake();
    }

    fn wake(&self) {
        self.inner.posted.notify_all();
        self.inner.wake.notify_one();
    }

    /// Returns `true` while the calling thread is executing one of this
    /// scheduler's jobs.
    pub fn is_current(&self) -> bool {
        CURRENT_SCHEDULER.with(|current| current.get() == self.inner.id)
    }

    /// Returns `true` while a driver loop is running for this scheduler.
    pub fn is_driven(&self) -> bool {
        self.inner.driven.load(Ordering::Acquire)
    }

    /// Number of jobs and timers waiting to run.
    pub fn pending(&self) -> usize {
        let queues = self.inner.queues.lock();
        queues.ready.len() + queues.timers.len()
    }

    /// Returns `true` if no job is runnable right now.
    ///
    /// Timers that are not yet due do not count.
    pub fn is_idle(&self) -> bool {
        let now = self.now();
        let queues = self.inner.queues.lock();
        queues.ready.is_empty() && !queues.timers.peek().is_some_and(|t| t.deadline <= now)
    }

    fn next_job(&self) -> Option<Job> {
        let now = self.now();
        let mut queues = self.inner.queues.lock();
        if let Some(job) = queues.ready.pop_front() {
            return Some(job);
        }
        if queues.timers.peek().is_some_and(|t| t.deadline <= now) {
            return queues.timers.pop().map(|entry| entry.job);
        }
        None
    }

    /// Time until the earliest pending timer, if any.
    fn next_timer_in(&self) -> Option<Duration> {
        let now = self.now();
        let queues = self.inner.queues.lock();
        queues
            .timers
            .peek()
            .map(|entry| entry.deadline.saturating_sub(now))
    }

    /// Run a single runnable job. Returns `false` if nothing was runnable.
    pub fn turn(&self) -> bool {
        let _turn = self.inner.turn.lock();
        let Some(job) = self.next_job() else {
            return false;
        };

        let _current = CurrentGuard::enter(self.inner.id);
        job();
        true
    }

    /// Run jobs until none is runnable. Returns how many ran.
    pub fn run_until_idle(&self) -> usize {
        let mut ran = 0;
        while self.turn() {
            ran += 1;
        }
        if ran > 0 {
            trace!(scheduler = self.inner.id, ran, "scheduler idle");
        }
        ran
    }

    /// Pump turns until `done` returns `true`, sleeping while idle.
    ///
    /// This is how blocking waits make progress when they are issued from a
    /// job or while no driver is running.
    pub fn run_until<F>(&self, mut done: F)
    where
        F: FnMut() -> bool,
    {
        while !done() {
            if !self.turn() {
                self.wait_for_work();
            }
        }
    }

    fn wait_for_work(&self) {
        let mut queues = self.inner.queues.lock();
        if !queues.ready.is_empty() {
            return;
        }
        let wait = match queues.timers.peek() {
            Some(entry) => entry
                .deadline
                .saturating_sub(self.now())
                .min(MAX_IDLE_WAIT),
            None => MAX_IDLE_WAIT,
        };
        if wait.is_zero() {
            return;
        }
        self.inner.posted.wait_for(&mut queues, wait);
    }

    /// Drive the loop until `shutdown` is cancelled.
    ///
    /// Jobs may block (native media calls do), so the driver should own a
    /// thread rather than share a multi-task runtime. [`Scheduler::start`]
    /// sets that up.
    pub async fn run(&self, shutdown: CancellationToken) {
        self.inner.driven.store(true, Ordering::Release);
        debug!(scheduler = self.inner.id, "scheduler driver started");

        while !shutdown.is_cancelled() {
            self.run_until_idle();

            let notified = self.inner.wake.notified();
            let park = self.next_timer_in().unwrap_or(DRIVER_IDLE_PARK);
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = notified => {}
                _ = time::sleep(park) => {}
            }
        }

        self.inner.driven.store(false, Ordering::Release);
        debug!(scheduler = self.inner.id, "scheduler driver stopped");
    }

    /// Start a dedicated driver thread.
    pub fn start(&self) -> io::Result<SchedulerThread> {
        let shutdown = CancellationToken::new();
        let scheduler = self.clone();
        let token = shutdown.clone();

        self.inner.driven.store(true, Ordering::Release);
        let spawned = std::thread::Builder::new()
            .name(format!("media-scheduler-{}", self.inner.id))
            .spawn(move || {
                if let Err(err) = runtime::block_on(scheduler.run(token)) {
                    error!(error = %err, "scheduler driver runtime failed to start");
                    scheduler.inner.driven.store(false, Ordering::Release);
                }
            });

        match spawned {
            Ok(handle) => Ok(SchedulerThread {
                shutdown,
                handle: Some(handle),
            }),
            Err(err) => {
                self.inner.driven.store(false, Ordering::Release);
                Err(err)
            }
        }
    }
}

/// Owner of a running driver thread. Dropping it stops and joins the thread.
#[derive(Debug)]
pub struct SchedulerThread {
    shutdown: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl SchedulerThread {
    /// Stop the driver and wait for its thread to exit.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        self.shutdown.cancel();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("scheduler driver thread panicked");
            }
        }
    }
}

impl Drop for SchedulerThread {
    fn drop(&mut self) {
        self.stop();
    }
}

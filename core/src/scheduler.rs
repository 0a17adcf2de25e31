//! The thread-backed scheduler.
//!
//! The [`Engine`] lock guards the [`RunState`] and the completion generation;
//! waiters block on a condvar paired with it. The worker never holds the lock
//! while `work` executes, so `request_run` is never blocked by a long run.

use std::fmt;
use std::io;
use std::sync::{Arc, Condvar, PoisonError};
use std::thread;
use std::time::Duration;

use rescheduler_types::{RunState, RunStats, SchedulerConfig, WorkPanic};
use tracing::warn;

use crate::engine::{Engine, PanicPayload};

/// Starts a worker thread running `body`.
type Spawner = fn(thread::Builder, Box<dyn FnOnce() + Send>) -> io::Result<()>;

fn spawn_thread(builder: thread::Builder, body: Box<dyn FnOnce() + Send>) -> io::Result<()> {
    builder.spawn(body).map(drop)
}

struct Shared {
    engine: Engine<Condvar>,
    spawner: Spawner,
}

/// Coalesces run requests into at most one active run plus one owed rerun.
///
/// Cloning yields another handle to the same instance. Dropping every handle
/// does not interrupt a cycle in progress; the worker finishes it.
///
/// # Panics in `work`
///
/// A panic never leaves the instance running. With
/// [`FailurePolicy::Propagate`](rescheduler_types::FailurePolicy::Propagate)
/// the first unclaimed panic is resumed on the next thread returning from
/// [`wait`](Self::wait), [`wait_timeout`](Self::wait_timeout) or
/// [`run_and_wait`](Self::run_and_wait), unless claimed earlier with
/// [`take_panic`](Self::take_panic).
///
/// # Deadlock
///
/// Calling [`wait`](Self::wait) from inside `work` blocks forever: the cycle
/// cannot finish while its own worker waits for it.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicUsize, Ordering};
///
/// use rescheduler_core::Rescheduler;
///
/// let runs = Arc::new(AtomicUsize::new(0));
/// let counter = Arc::clone(&runs);
/// let scheduler = Rescheduler::new(move || {
///     counter.fetch_add(1, Ordering::SeqCst);
/// });
///
/// scheduler.request_run();
/// scheduler.wait();
/// assert!(runs.load(Ordering::SeqCst) >= 1);
/// ```
#[derive(Clone)]
pub struct Rescheduler {
    shared: Arc<Shared>,
}

impl fmt::Debug for Rescheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rescheduler")
            .field("name", &self.name())
            .field("state", &self.state())
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

impl Rescheduler {
    pub fn new<F>(work: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self::with_config(SchedulerConfig::default(), work)
    }

    pub fn with_config<F>(config: SchedulerConfig, work: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self::with_spawner(config, work, spawn_thread)
    }

    fn with_spawner<F>(config: SchedulerConfig, work: F, spawner: Spawner) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self {
            shared: Arc::new(Shared {
                engine: Engine::new(config, Box::new(work), Condvar::new()),
                spawner,
            }),
        }
    }

    /// Ask for `work` to run. Never blocks on `work`.
    ///
    /// If the instance is idle a worker thread is launched. Otherwise a rerun
    /// is owed; any number of calls during one run owe exactly one rerun.
    pub fn request_run(&self) {
        if self.shared.engine.request().launches_worker() {
            Shared::launch(&self.shared);
        }
    }

    /// Block until the run-cycle active at call time has finished, including
    /// any rerun owed to it. Returns immediately when idle.
    pub fn wait(&self) {
        let engine = &self.shared.engine;
        let mut state = engine.lock();
        if !state.is_idle() {
            let target = state.generation();
            state = engine
                .completion()
                .wait_while(state, |state| state.generation() == target)
                .unwrap_or_else(PoisonError::into_inner);
        }
        drop(state);
        engine.raise_pending();
    }

    /// Like [`wait`](Self::wait), bounded by `timeout`.
    ///
    /// Returns `true` if the cycle finished (or none was active) and `false`
    /// if the timeout elapsed first.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let engine = &self.shared.engine;
        let mut state = engine.lock();
        let mut finished = true;
        if !state.is_idle() {
            let target = state.generation();
            (state, _) = engine
                .completion()
                .wait_timeout_while(state, timeout, |state| state.generation() == target)
                .unwrap_or_else(PoisonError::into_inner);
            finished = state.generation() != target;
        }
        drop(state);
        engine.raise_pending();
        finished
    }

    /// Request a run, then wait for the cycle that covers it.
    pub fn run_and_wait(&self) {
        self.request_run();
        self.wait();
    }

    /// Claim a panic held under `FailurePolicy::Propagate` without
    /// unwinding. A claimed panic is no longer resumed by `wait`.
    #[must_use]
    pub fn take_panic(&self) -> Option<PanicPayload> {
        self.shared.engine.take_panic()
    }

    #[must_use]
    pub fn state(&self) -> RunState {
        self.shared.engine.state()
    }

    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.state().is_idle()
    }

    #[must_use]
    pub fn stats(&self) -> RunStats {
        self.shared.engine.stats()
    }

    /// The most recent panic raised by `work`, if any.
    #[must_use]
    pub fn last_failure(&self) -> Option<WorkPanic> {
        self.shared.engine.last_failure()
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.shared.engine.name()
    }

    #[must_use]
    pub fn config(&self) -> &SchedulerConfig {
        self.shared.engine.config()
    }
}

impl Shared {
    /// Start a worker for a cycle. The caller has already moved the state
    /// out of idle, so this worker is the only one.
    fn launch(shared: &Arc<Self>) {
        let config = shared.engine.config();
        let mut builder = thread::Builder::new().name(config.name().to_string());
        if let Some(bytes) = config.stack_size() {
            builder = builder.stack_size(bytes);
        }

        let worker = Arc::clone(shared);
        if let Err(e) = (shared.spawner)(builder, Box::new(move || worker.engine.run_cycle())) {
            // The state is already non-idle; running here keeps the request.
            // `run_cycle` never unwinds, so the caller is not exposed to `work`.
            warn!(
                scheduler = %config.name(),
                "Failed to spawn worker thread, running cycle inline: {e}"
            );
            shared.engine.run_cycle();
        }
    }
}

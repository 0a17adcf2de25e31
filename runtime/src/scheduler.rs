//! The tokio-backed scheduler.
//!
//! The completion signal is a `watch` channel carrying the number of
//! completed run-cycles. It is only advanced while the engine lock is held,
//! so a waiter that reads the generation and subscribes under that lock
//! cannot miss the release of its cycle.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use rescheduler_core::PanicPayload;
use rescheduler_core::engine::{Completion, Engine};
use rescheduler_types::{RunState, RunStats, SchedulerConfig, WorkPanic};
use tokio::runtime::{Handle, TryCurrentError};
use tokio::sync::watch;
use tokio::time;

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("no tokio runtime is active: {0}")]
    NoRuntime(#[from] TryCurrentError),
}

/// Publishes each finished generation to async waiters.
struct Completed(watch::Sender<u64>);

impl Completion for Completed {
    fn complete(&self, generation: u64) {
        self.0.send_replace(generation);
    }
}

struct Shared {
    engine: Engine<Completed>,
    handle: Handle,
}

/// Coalescing scheduler whose worker runs on tokio's blocking pool.
///
/// `request_run` is synchronous and may be called from any thread, inside or
/// outside the runtime. `wait` is async. Clones are handles to the same
/// instance.
///
/// Under [`FailurePolicy::Propagate`](rescheduler_types::FailurePolicy::Propagate)
/// the first unclaimed panic from `work` is resumed in the next task
/// returning from `wait`, `wait_timeout` or `run_and_wait`.
///
/// The worker-thread options of [`SchedulerConfig`] (`stack_size`) do not
/// apply; blocking-pool threads are configured on the runtime.
#[derive(Clone)]
pub struct AsyncRescheduler {
    shared: Arc<Shared>,
}

impl fmt::Debug for AsyncRescheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncRescheduler")
            .field("name", &self.name())
            .field("state", &self.state())
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

impl AsyncRescheduler {
    /// Build a scheduler bound to the current tokio runtime.
    pub fn new<F>(work: F) -> Result<Self, RuntimeError>
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self::with_config(SchedulerConfig::default(), work)
    }

    pub fn with_config<F>(config: SchedulerConfig, work: F) -> Result<Self, RuntimeError>
    where
        F: Fn() + Send + Sync + 'static,
    {
        let handle = Handle::try_current()?;
        Ok(Self::with_handle(handle, config, work))
    }

    /// Build a scheduler whose workers run on `handle`'s blocking pool.
    pub fn with_handle<F>(handle: Handle, config: SchedulerConfig, work: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        let (completed, _) = watch::channel(0);
        Self {
            shared: Arc::new(Shared {
                engine: Engine::new(config, Box::new(work), Completed(completed)),
                handle,
            }),
        }
    }

    /// Ask for `work` to run. Never blocks on `work`.
    pub fn request_run(&self) {
        if self.shared.engine.request().launches_worker() {
            let worker = Arc::clone(&self.shared);
            drop(self.shared.handle.spawn_blocking(move || worker.engine.run_cycle()));
        }
    }

    /// Wait until the run-cycle active at call time has finished, including
    /// any rerun owed to it. Resolves immediately when idle.
    pub async fn wait(&self) {
        if let Some((target, mut completed)) = self.observe() {
            // The sender lives as long as `self`, so this cannot close early.
            let _ = completed.wait_for(|generation| *generation > target).await;
        }
        self.shared.engine.raise_pending();
    }

    /// Like [`wait`](Self::wait), bounded by `timeout`. Returns `false` if
    /// the timeout elapsed first.
    pub async fn wait_timeout(&self, timeout: Duration) -> bool {
        let finished = match self.observe() {
            None => true,
            Some((target, mut completed)) => {
                time::timeout(timeout, completed.wait_for(|generation| *generation > target))
                    .await
                    .is_ok()
            }
        };
        self.shared.engine.raise_pending();
        finished
    }

    /// Request a run, then wait for the cycle that covers it.
    pub async fn run_and_wait(&self) {
        self.request_run();
        self.wait().await;
    }

    /// Claim a panic held under `FailurePolicy::Propagate` without
    /// unwinding.
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

    /// Snapshot the generation to wait past, subscribing under the lock.
    /// `None` when idle.
    fn observe(&self) -> Option<(u64, watch::Receiver<u64>)> {
        let engine = &self.shared.engine;
        let state = engine.lock();
        if state.is_idle() {
            return None;
        }
        Some((state.generation(), engine.completion().0.subscribe()))
    }
}

//! The run-cycle engine shared by every scheduler flavour.
//!
//! An [`Engine`] owns the state machine, the completion generation, the
//! counters and any panic held for a waiter. A flavour supplies two things:
//! how a worker is started (it calls [`Engine::run_cycle`] on the worker) and
//! a [`Completion`] that wakes its waiters.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use rescheduler_types::{
    CycleStep, FailurePolicy, RequestOutcome, RunCounters, RunState, RunStats, SchedulerConfig,
    Work, WorkPanic,
};
use tracing::{debug, error, trace};

pub type PanicPayload = Box<dyn Any + Send>;

/// Wakes waiters when a run-cycle finishes.
pub trait Completion: Send + Sync {
    /// Called with the state lock held, once per finished cycle, with the new
    /// generation.
    fn complete(&self, generation: u64);
}

impl Completion for Condvar {
    fn complete(&self, _generation: u64) {
        self.notify_all();
    }
}

/// State guarded by the engine lock.
#[derive(Default)]
pub struct CycleState {
    state: RunState,
    /// Completed run-cycles. Advancing it under the lock is what releases
    /// waiters; a fresh cycle is implicitly armed by the next value.
    generation: u64,
    /// First unclaimed panic under [`FailurePolicy::Propagate`].
    panic: Option<PanicPayload>,
}

impl CycleState {
    #[must_use]
    pub fn run_state(&self) -> RunState {
        self.state
    }

    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.state.is_idle()
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

pub struct Engine<C> {
    config: SchedulerConfig,
    work: Box<Work>,
    state: Mutex<CycleState>,
    counters: RunCounters,
    completion: C,
}

impl<C: Completion> Engine<C> {
    pub fn new(config: SchedulerConfig, work: Box<Work>, completion: C) -> Self {
        Self {
            config,
            work,
            state: Mutex::new(CycleState::default()),
            counters: RunCounters::default(),
            completion,
        }
    }

    #[must_use]
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.config.name()
    }

    #[must_use]
    pub fn completion(&self) -> &C {
        &self.completion
    }

    /// Lock the cycle state. `work` never runs under this lock and a panic
    /// in `work` cannot poison it, so poisoning is ignored.
    pub fn lock(&self) -> MutexGuard<'_, CycleState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn state(&self) -> RunState {
        self.lock().run_state()
    }

    #[must_use]
    pub fn stats(&self) -> RunStats {
        self.counters.snapshot()
    }

    #[must_use]
    pub fn last_failure(&self) -> Option<WorkPanic> {
        self.counters.last_failure()
    }

    /// Record a run request. The caller must start a worker when the outcome
    /// [`launches_worker`](RequestOutcome::launches_worker).
    #[must_use]
    pub fn request(&self) -> RequestOutcome {
        let outcome = self.lock().state.on_request();
        self.counters.record_request(!outcome.launches_worker());

        let name = self.name();
        match outcome {
            RequestOutcome::Launch => {
                debug!(scheduler = %name, "Run requested; launching worker");
            }
            RequestOutcome::Coalesced => {
                debug!(scheduler = %name, "Run requested while running; rerun owed");
            }
            RequestOutcome::AlreadyPending => {
                trace!(scheduler = %name, "Run requested; folded into owed rerun");
            }
        }
        outcome
    }

    /// Execute `work` until no rerun is owed, then go idle and wake waiters.
    ///
    /// Never unwinds. Under [`FailurePolicy::Propagate`] a panic is held for
    /// the next waiter instead; see [`raise_pending`](Self::raise_pending).
    pub fn run_cycle(&self) {
        let name = self.name();
        loop {
            let run = self.counters.record_run();
            trace!(scheduler = %name, run, "Executing work");

            let payload = panic::catch_unwind(AssertUnwindSafe(|| (self.work)())).err();
            if let Some(payload) = &payload {
                let failure = WorkPanic::from_payload(payload.as_ref(), run);
                error!(scheduler = %name, run, "{failure}");
                self.counters.record_failure(failure);
            }

            let mut state = self.lock();
            if let Some(payload) = payload
                && self.config.failure_policy() == FailurePolicy::Propagate
                && state.panic.is_none()
            {
                state.panic = Some(payload);
            }

            let step = state.state.on_run_finished();
            if step == CycleStep::Finished {
                state.generation += 1;
                self.counters.record_cycle();
                self.completion.complete(state.generation);
                debug!(
                    scheduler = %name,
                    generation = state.generation,
                    runs = run,
                    "Cycle complete; idle"
                );
                return;
            }
            drop(state);
            debug!(scheduler = %name, "Rerun owed; executing again");
        }
    }

    /// Claim the held panic, if any.
    #[must_use]
    pub fn take_panic(&self) -> Option<PanicPayload> {
        self.lock().panic.take()
    }

    /// Resume a held panic on the calling thread. Waiters call this on their
    /// way out so a `Propagate` failure reaches exactly one of them.
    pub fn raise_pending(&self) {
        if let Some(payload) = self.take_panic() {
            debug!(scheduler = %self.name(), "Re-raising work panic on waiter");
            panic::resume_unwind(payload);
        }
    }
}

//! The run-coalescing state machine.
//!
//! Both scheduler flavours drive the same transitions; they differ only in
//! how the worker is launched and how waiters are woken. Transitions are pure
//! functions of the current state so they can be exercised without threads.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle state of a scheduler instance.
///
/// Invariant: a worker exists iff the state is not [`RunState::Idle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    /// No worker active.
    #[default]
    Idle,
    /// Worker active, no rerun owed.
    Running,
    /// Worker active, exactly one rerun owed.
    RunningWithRerun,
}

/// What the caller of [`RunState::on_request`] must do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    /// The instance was idle; the caller launches the one worker.
    Launch,
    /// A worker is active; a rerun is now owed.
    Coalesced,
    /// A rerun was already owed; the request folds into it.
    AlreadyPending,
}

impl RequestOutcome {
    #[must_use]
    pub fn launches_worker(self) -> bool {
        self == Self::Launch
    }
}

/// What the worker does after an execution of `work` returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleStep {
    /// A rerun was owed; run `work` again on the same worker.
    Rerun,
    /// Nothing owed; the cycle is over and waiters are released.
    Finished,
}

impl RunState {
    /// Apply a run request. Must be called with the state lock held.
    pub fn on_request(&mut self) -> RequestOutcome {
        match *self {
            Self::Idle => {
                *self = Self::Running;
                RequestOutcome::Launch
            }
            Self::Running => {
                *self = Self::RunningWithRerun;
                RequestOutcome::Coalesced
            }
            Self::RunningWithRerun => RequestOutcome::AlreadyPending,
        }
    }

    /// Apply the end of one execution of `work`. Must be called with the
    /// state lock held, and only by the active worker.
    ///
    /// Calling this while idle is a logic error; it is reported as
    /// [`CycleStep::Finished`] and leaves the state idle.
    pub fn on_run_finished(&mut self) -> CycleStep {
        match *self {
            Self::RunningWithRerun => {
                *self = Self::Running;
                CycleStep::Rerun
            }
            Self::Running | Self::Idle => {
                *self = Self::Idle;
                CycleStep::Finished
            }
        }
    }

    #[must_use]
    pub fn is_idle(self) -> bool {
        self == Self::Idle
    }

    #[must_use]
    pub fn rerun_owed(self) -> bool {
        self == Self::RunningWithRerun
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::RunningWithRerun => "running_with_rerun",
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

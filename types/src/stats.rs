//! Run counters shared by both scheduler flavours.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use serde::Serialize;

use crate::failure::WorkPanic;

/// Point-in-time copy of an instance's counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RunStats {
    /// Calls to `request_run`.
    pub requests: u64,
    /// Requests absorbed into an owed rerun instead of launching a worker.
    pub coalesced: u64,
    /// Executions of `work`, including ones that panicked.
    pub runs: u64,
    /// Executions of `work` that panicked.
    pub failures: u64,
    /// Completed run-cycles (returns to idle).
    pub cycles: u64,
}

impl RunStats {
    /// Requests that launched a worker.
    #[must_use]
    pub fn launches(&self) -> u64 {
        self.requests.saturating_sub(self.coalesced)
    }
}

/// Lock-free counters behind [`RunStats`], plus the most recent panic.
#[derive(Debug, Default)]
pub struct RunCounters {
    requests: AtomicU64,
    coalesced: AtomicU64,
    runs: AtomicU64,
    failures: AtomicU64,
    cycles: AtomicU64,
    last_failure: Mutex<Option<WorkPanic>>,
}

impl RunCounters {
    pub fn record_request(&self, coalesced: bool) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        if coalesced {
            self.coalesced.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Returns the 1-based index of this execution.
    pub fn record_run(&self) -> u64 {
        self.runs.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn record_failure(&self, failure: WorkPanic) {
        self.failures.fetch_add(1, Ordering::Relaxed);
        *self
            .last_failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(failure);
    }

    pub fn record_cycle(&self) {
        self.cycles.fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn snapshot(&self) -> RunStats {
        RunStats {
            requests: self.requests.load(Ordering::Relaxed),
            coalesced: self.coalesced.load(Ordering::Relaxed),
            runs: self.runs.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            cycles: self.cycles.load(Ordering::Relaxed),
        }
    }

    #[must_use]
    pub fn last_failure(&self) -> Option<WorkPanic> {
        self.last_failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

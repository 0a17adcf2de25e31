//! Thread-backed run-coalescing scheduler.
//!
//! [`Rescheduler`] guarantees that `work` runs at least once after every
//! [`request_run`](Rescheduler::request_run), while a burst of requests that
//! arrives during a run collapses into a single extra run. The worker is a
//! dedicated OS thread that lives for one run-cycle.
//!
//! The cycle itself lives in [`engine`] so other worker backends can reuse it.

pub mod engine;
mod scheduler;

pub use engine::PanicPayload;
pub use rescheduler_types::{
    FailurePolicy, RunState, RunStats, SchedulerConfig, SchedulerConfigError, WorkPanic,
};
pub use scheduler::Rescheduler;

//! Tokio-backed run-coalescing scheduler.
//!
//! [`AsyncRescheduler`] drives the same run-cycle engine as the thread-backed
//! scheduler but runs `work` on tokio's blocking pool and lets waiters
//! `.await` the end of a run-cycle instead of blocking a thread.

mod scheduler;

pub use rescheduler_core::PanicPayload;
pub use rescheduler_types::{
    FailurePolicy, RunState, RunStats, SchedulerConfig, SchedulerConfigError, WorkPanic,
};
pub use scheduler::{AsyncRescheduler, RuntimeError};

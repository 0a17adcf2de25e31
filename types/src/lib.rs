//! Core domain types for the rescheduler.
//!
//! This crate contains pure domain types with no IO and no async. Both the
//! thread-backed and the tokio-backed schedulers drive the same [`RunState`]
//! machine and report through the same [`RunCounters`].

// Pedantic lint configuration - these are intentional design choices
#![allow(clippy::missing_errors_doc)] // Result-returning functions are self-explanatory

mod failure;
mod settings;
mod state;
mod stats;

pub use failure::{WorkPanic, panic_payload_to_string};
pub use settings::{
    DEFAULT_SCHEDULER_NAME, FailurePolicy, MIN_STACK_SIZE, SchedulerConfig, SchedulerConfigError,
};
pub use state::{CycleStep, RequestOutcome, RunState};
pub use stats::{RunCounters, RunStats};

/// The work function driven by a scheduler: synchronous, no arguments, no
/// observed return value.
pub type Work = dyn Fn() + Send + Sync + 'static;

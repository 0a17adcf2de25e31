//! Run-coalescing scheduler.
//!
//! A scheduler is bound to one synchronous `work` function. Every
//! `request_run` guarantees a run of `work` that starts at or after the
//! request, while requests arriving during a run collapse into a single
//! rerun:
//!
//! ```text
//! request_run()  -> starts the worker
//! request_run()  -> rerun owed
//! request_run()  -> still one rerun owed
//! ...first run ends, the same worker runs once more, then goes idle
//! ```
//!
//! Two flavours share one state machine:
//!
//! - [`Rescheduler`]: the worker is an OS thread; `wait` blocks.
//! - [`AsyncRescheduler`] (feature `async`): the worker runs on tokio's
//!   blocking pool; `wait` is a future.
//!
//! Settings come from [`SchedulerConfig`], built in code or loaded from the
//! `[scheduler]` table of a TOML file via [`config::load`].

pub use rescheduler_core::{PanicPayload, Rescheduler};
#[cfg(feature = "async")]
pub use rescheduler_runtime::{AsyncRescheduler, RuntimeError};
pub use rescheduler_types::{
    DEFAULT_SCHEDULER_NAME, FailurePolicy, MIN_STACK_SIZE, RunState, RunStats, SchedulerConfig,
    SchedulerConfigError, WorkPanic,
};

/// Loading [`SchedulerConfig`] from TOML.
pub mod config {
    pub use rescheduler_config::{ConfigError, from_toml_str, load, load_or_default};
}

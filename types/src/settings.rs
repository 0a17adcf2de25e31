//! Resolved scheduler configuration.
//!
//! The raw deserialization struct (with `Option` fields) stays private. It is
//! resolved into [`SchedulerConfig`] at the parse boundary, so a
//! `SchedulerConfig` value is always valid.

use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};

/// Default instance name used in log records and as the worker thread name.
pub const DEFAULT_SCHEDULER_NAME: &str = "rescheduler";

/// Smallest worker stack accepted for the thread-backed scheduler.
pub const MIN_STACK_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchedulerConfigError {
    #[error("scheduler name must not be empty")]
    EmptyName,
    #[error("scheduler name must not contain NUL bytes")]
    NulInName,
    #[error("stack_size must be at least 65536 bytes (got {0})")]
    StackTooSmall(usize),
}

/// What the worker does after `work` panics.
///
/// In both cases the panic is caught, logged, counted, and the state machine
/// still runs, so waiters are always released.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Keep the worker running; an owed rerun executes as usual.
    #[default]
    Continue,
    /// Hold the first unclaimed panic and resume it on the next caller
    /// returning from `wait`. The worker itself carries on, so an owed rerun
    /// executes as usual.
    Propagate,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSchedulerConfig {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    failure_policy: Option<FailurePolicy>,
    #[serde(default)]
    stack_size: Option<usize>,
}

/// Validated scheduler configuration.
///
/// Invariants: `name` is non-empty and NUL-free; `stack_size`, when set, is
/// at least [`MIN_STACK_SIZE`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawSchedulerConfig")]
pub struct SchedulerConfig {
    name: String,
    failure_policy: FailurePolicy,
    stack_size: Option<NonZeroUsize>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_SCHEDULER_NAME.to_string(),
            failure_policy: FailurePolicy::default(),
            stack_size: None,
        }
    }
}

impl TryFrom<RawSchedulerConfig> for SchedulerConfig {
    type Error = SchedulerConfigError;

    fn try_from(raw: RawSchedulerConfig) -> Result<Self, Self::Error> {
        let mut config = Self::default();
        if let Some(name) = raw.name {
            config = config.with_name(name)?;
        }
        if let Some(policy) = raw.failure_policy {
            config = config.with_failure_policy(policy);
        }
        if let Some(bytes) = raw.stack_size {
            config = config.with_stack_size(bytes)?;
        }
        Ok(config)
    }
}

impl SchedulerConfig {
    pub fn with_name(mut self, name: impl Into<String>) -> Result<Self, SchedulerConfigError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(SchedulerConfigError::EmptyName);
        }
        if name.contains('\0') {
            return Err(SchedulerConfigError::NulInName);
        }
        self.name = name;
        Ok(self)
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn with_stack_size(mut self, bytes: usize) -> Result<Self, SchedulerConfigError> {
        if bytes < MIN_STACK_SIZE {
            return Err(SchedulerConfigError::StackTooSmall(bytes));
        }
        self.stack_size = NonZeroUsize::new(bytes);
        Ok(self)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn failure_policy(&self) -> FailurePolicy {
        self.failure_policy
    }

    /// Worker stack size for the thread-backed scheduler. `None` uses the
    /// platform default.
    #[must_use]
    pub fn stack_size(&self) -> Option<usize> {
        self.stack_size.map(NonZeroUsize::get)
    }
}

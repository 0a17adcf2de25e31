//! Panics raised by the work function.

use std::any::Any;
use std::fmt;

/// Record of one execution of `work` that panicked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkPanic {
    message: String,
    /// 1-based execution index within the instance.
    run: u64,
}

impl WorkPanic {
    #[must_use]
    pub fn new(message: impl Into<String>, run: u64) -> Self {
        Self {
            message: message.into(),
            run,
        }
    }

    /// Build a record from a `catch_unwind` payload.
    #[must_use]
    pub fn from_payload(payload: &(dyn Any + Send), run: u64) -> Self {
        Self::new(panic_payload_to_string(payload), run)
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub fn run(&self) -> u64 {
        self.run
    }
}

impl fmt::Display for WorkPanic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "work panicked on run {}: {}", self.run, self.message)
    }
}

#[must_use]
pub fn panic_payload_to_string(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

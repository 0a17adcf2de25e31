//! Building schedulers from TOML configuration.

use std::fs;
use std::sync::{Arc, Mutex};
use std::thread;

use rescheduler::config::{self, ConfigError};
use rescheduler::{FailurePolicy, Rescheduler};

use crate::common::init_tracing;

#[test]
fn scheduler_built_from_config_file_names_its_worker() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rescheduler.toml");
    fs::write(
        &path,
        "[scheduler]\nname = \"search-index\"\nfailure_policy = \"continue\"\n",
    )
    .unwrap();

    let config = config::load(&path).unwrap();
    assert_eq!(config.failure_policy(), FailurePolicy::Continue);

    let seen = Arc::new(Mutex::new(String::new()));
    let slot = Arc::clone(&seen);
    let scheduler = Rescheduler::with_config(config, move || {
        *slot.lock().unwrap() = thread::current().name().unwrap_or_default().to_string();
    });
    scheduler.run_and_wait();

    assert_eq!(*seen.lock().unwrap(), "search-index");
}

#[test]
fn invalid_config_file_is_reported_with_its_path() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rescheduler.toml");
    fs::write(&path, "[scheduler]\nname = \"\"\n").unwrap();

    let err = config::load(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid { .. }));
    assert_eq!(err.path(), Some(path.as_path()));
    assert!(err.to_string().contains("must not be empty"));
}

#[test]
fn malformed_config_file_is_a_parse_error() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rescheduler.toml");
    fs::write(&path, "[scheduler\nname = ").unwrap();

    let err = config::load(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
    assert_eq!(err.path(), Some(path.as_path()));

    let err = config::from_toml_str("[scheduler\nname = ").unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
    assert_eq!(err.path(), None);
}

#[test]
fn missing_config_file_falls_back_to_defaults() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let config = config::load_or_default(dir.path().join("absent.toml")).unwrap();
    assert_eq!(config.name(), rescheduler::DEFAULT_SCHEDULER_NAME);
}

//! Configuration loading for the rescheduler.
//!
//! A scheduler reads its settings from the `[scheduler]` table of a TOML
//! document:
//!
//! ```toml
//! [scheduler]
//! name = "reindex"
//! failure_policy = "propagate"
//! stack_size = 262144
//! ```
//!
//! A missing table resolves to [`SchedulerConfig::default`]. Other tables are
//! ignored so the section can live inside an embedding application's config.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use toml::Table;

pub use rescheduler_types::{FailurePolicy, SchedulerConfig, SchedulerConfigError};

const SCHEDULER_TABLE: &str = "scheduler";

/// Why a scheduler config could not be loaded.
///
/// `Parse` means the text is not TOML. `Invalid` means it is TOML but the
/// `[scheduler]` table is rejected (wrong types, unknown keys, or values that
/// fail [`SchedulerConfig`] validation).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to parse config{}: {source}", located(.path.as_deref()))]
    Parse {
        path: Option<PathBuf>,
        source: toml::de::Error,
    },
    #[error("invalid scheduler config{}: {source}", located(.path.as_deref()))]
    Invalid {
        path: Option<PathBuf>,
        source: toml::de::Error,
    },
}

fn located(path: Option<&Path>) -> String {
    path.map(|path| format!(" at {}", path.display()))
        .unwrap_or_default()
}

impl ConfigError {
    /// The file the error came from, when loading from disk.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Read { path, .. } => Some(path.as_path()),
            Self::Parse { path, .. } | Self::Invalid { path, .. } => path.as_deref(),
        }
    }
}

/// Parse the document, then resolve its `[scheduler]` table. Keeping the two
/// steps apart is what separates `Parse` from `Invalid`.
fn resolve(content: &str, path: Option<&Path>) -> Result<SchedulerConfig, ConfigError> {
    let mut document: Table = toml::from_str(content).map_err(|source| ConfigError::Parse {
        path: path.map(Path::to_path_buf),
        source,
    })?;
    let Some(table) = document.remove(SCHEDULER_TABLE) else {
        return Ok(SchedulerConfig::default());
    };
    table.try_into().map_err(|source| ConfigError::Invalid {
        path: path.map(Path::to_path_buf),
        source,
    })
}

/// Parse a scheduler config from TOML text.
pub fn from_toml_str(content: &str) -> Result<SchedulerConfig, ConfigError> {
    resolve(content, None)
}

/// Read and parse a scheduler config file.
pub fn load(path: impl AsRef<Path>) -> Result<SchedulerConfig, ConfigError> {
    let path = path.as_ref();
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(source) => {
            tracing::warn!(path = %path.display(), "Failed to read scheduler config: {source}");
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    match resolve(&content, Some(path)) {
        Ok(config) => {
            tracing::debug!(
                path = %path.display(),
                scheduler = %config.name(),
                "Loaded scheduler config"
            );
            Ok(config)
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), "Rejected scheduler config: {e}");
            Err(e)
        }
    }
}

/// Like [`load`], but a missing file resolves to the defaults.
pub fn load_or_default(path: impl AsRef<Path>) -> Result<SchedulerConfig, ConfigError> {
    let path = path.as_ref();
    if !path.exists() {
        tracing::debug!(path = %path.display(), "No scheduler config; using defaults");
        return Ok(SchedulerConfig::default());
    }
    load(path)
}

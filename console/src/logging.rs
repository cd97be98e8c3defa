//! Structured logging for rhost
//!
//! `tracing` with an `EnvFilter`. The level comes from the config file or
//! `--log-level`, and `RUST_LOG` overrides both. Logs go to stderr unless a
//! file is configured; a file is the better choice while the line editor owns
//! the terminal, since stderr output lands in the middle of the prompt.
//!
//! Never log submitted lines at levels above `trace`: they can hold secrets.

use serde::Deserialize;
use std::io;
#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

static LOGGING_INITIALIZED: OnceLock<()> = OnceLock::new();

/// `[log]` section of the config file
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Filter directive (trace, debug, info, warn, error, or full EnvFilter syntax)
    pub level: String,
    /// Append logs here instead of stderr
    pub file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            file: None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error("logging already initialized")]
    AlreadyInitialized,

    #[error("invalid log level: {0}")]
    InvalidLevel(String),

    #[error("failed to create log file: {0}")]
    FileCreate(#[from] io::Error),

    #[error("failed to set global subscriber: {0}")]
    SetSubscriber(#[from] tracing_subscriber::util::TryInitError),
}

fn ensure_parent_dir(path: &Path) -> io::Result<()> {
    let Some(parent) = path.parent() else {
        return Ok(());
    };
    if parent.as_os_str().is_empty() {
        return Ok(());
    }
    let existed = parent.exists();
    std::fs::create_dir_all(parent)?;
    #[cfg(unix)]
    if !existed {
        std::fs::set_permissions(parent, std::fs::Permissions::from_mode(0o700))?;
    }
    Ok(())
}

/// Build the filter: `RUST_LOG` if set, else `level`
pub fn build_filter(level: &str) -> Result<EnvFilter, LogError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => {
            EnvFilter::try_new(level).map_err(|_| LogError::InvalidLevel(level.to_string()))
        }
    }
}

/// Install the global subscriber. Call once at startup.
pub fn init_logging(config: &LogConfig) -> Result<(), LogError> {
    if LOGGING_INITIALIZED.get().is_some() {
        return Err(LogError::AlreadyInitialized);
    }

    let filter = build_filter(&config.level)?;

    match &config.file {
        Some(path) => {
            ensure_parent_dir(path)?;
            let existed = path.exists();
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            #[cfg(unix)]
            if !existed {
                std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
            }
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .with_writer(std::sync::Mutex::new(file))
                        .with_target(true)
                        .with_ansi(false),
                )
                .try_init()?;
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .with_writer(io::stderr)
                        .with_target(true)
                        .with_ansi(true),
                )
                .try_init()?;
        }
    }

    let _ = LOGGING_INITIALIZED.set(());
    tracing::debug!(level = %config.level, file = ?config.file, "logging initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_level_is_warn() {
        let config = LogConfig::default();
        assert_eq!(config.level, "warn");
        assert!(config.file.is_none());
    }

    #[test]
    fn test_invalid_level_rejected() {
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        match build_filter("rhost=loud") {
            Err(LogError::InvalidLevel(level)) => assert_eq!(level, "rhost=loud"),
            other => panic!("Expected InvalidLevel, got {:?}", other.map(|_| ())),
        }
        assert!(build_filter("debug").is_ok());
    }

    #[test]
    fn test_parent_dir_created() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/logs/rhost.log");
        ensure_parent_dir(&path).unwrap();
        assert!(path.parent().unwrap().is_dir());
    }
}

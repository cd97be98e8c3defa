//! Configuration
//!
//! Two layers. `Config` is the TOML file, read once at startup. `Settings` is
//! the snapshot the prompt uses, built on the first console read from the file
//! values with R's `rhost.*` options laid on top.

use crate::logging::LogConfig;
use rhost_runtime::{OptionValue, RuntimeOptions};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Name of the history file in the home directory
pub const HISTORY_FILE_NAME: &str = ".rhost_history";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditingMode {
    #[default]
    Emacs,
    #[serde(alias = "vim")]
    Vi,
}

impl EditingMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "emacs" => Some(EditingMode::Emacs),
            "vi" | "vim" => Some(EditingMode::Vi),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    pub color_scheme: String,
    pub editing_mode: EditingMode,
    pub show_statusbar: bool,
    /// Inputhook interval in milliseconds
    pub poll_interval_ms: u64,
    pub history_file: Option<PathBuf>,
    pub blank_line_before_prompt: bool,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            color_scheme: "native".to_string(),
            editing_mode: EditingMode::Emacs,
            show_statusbar: true,
            poll_interval_ms: 33,
            history_file: None,
            blank_line_before_prompt: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub r_home: Option<PathBuf>,
    pub program_name: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            r_home: None,
            program_name: "rhost".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub console: ConsoleConfig,
    pub runtime: RuntimeConfig,
    pub log: LogConfig,
}

impl Config {
    /// `$XDG_CONFIG_HOME/rhost/config.toml` or the platform equivalent
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("rhost").join("config.toml"))
    }

    /// Load `path`, or the default location when `None`
    ///
    /// A missing file at the default location yields the defaults; a missing
    /// file that was asked for explicitly is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (path, explicit) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => match Self::default_path() {
                Some(path) => (path, false),
                None => return Ok(Config::default()),
            },
        };

        if !explicit && !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Config::default());
        }

        let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        let config = Self::from_toml(&text).map_err(|source| ConfigError::Parse {
            path: path.clone(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "config loaded");
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.console.poll_interval_ms)
    }

    /// Where history is kept; `None` when there is no home directory
    pub fn history_path(&self) -> Option<PathBuf> {
        self.console
            .history_file
            .clone()
            .or_else(|| dirs::home_dir().map(|home| home.join(HISTORY_FILE_NAME)))
    }
}

/// The settings snapshot the prompt reads
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub color_scheme: String,
    pub editing_mode: EditingMode,
    pub show_statusbar: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Settings::from(&ConsoleConfig::default())
    }
}

impl From<&ConsoleConfig> for Settings {
    fn from(console: &ConsoleConfig) -> Self {
        Settings {
            color_scheme: console.color_scheme.clone(),
            editing_mode: console.editing_mode,
            show_statusbar: console.show_statusbar,
        }
    }
}

/// Anything that can answer `getOption(name)`
pub trait SettingsSource {
    fn option(&self, name: &str) -> Option<OptionValue>;
}

impl SettingsSource for RuntimeOptions {
    fn option(&self, name: &str) -> Option<OptionValue> {
        self.get(name)
    }
}

impl Settings {
    /// File values, overridden by whatever `source` has set
    pub fn resolve(console: &ConsoleConfig, source: Option<&dyn SettingsSource>) -> Self {
        let mut settings = Settings::from(console);
        let Some(source) = source else {
            return settings;
        };

        let scheme = source.option("rhost.color_scheme");
        if let Some(scheme) = scheme.as_ref().and_then(OptionValue::as_str) {
            settings.color_scheme = scheme.to_string();
        }

        if let Some(value) = source.option("rhost.editing_mode") {
            match value.as_str().and_then(EditingMode::parse) {
                Some(mode) => settings.editing_mode = mode,
                None => tracing::warn!(?value, "ignoring unknown rhost.editing_mode"),
            }
        }

        if let Some(show) = source.option("rhost.show_statusbar").and_then(|v| v.as_bool()) {
            settings.show_statusbar = show;
        }

        tracing::debug!(?settings, "settings resolved");
        settings
    }
}

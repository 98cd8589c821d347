//! Runner settings from `taskqueue.toml` and the environment.
//!
//! Reads `taskqueue.toml` from the working directory unless another file is
//! named on the command line or in `TASKQUEUE_CONFIG`. Every field has a
//! default so the file is optional. Environment variables take precedence
//! over file values.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use taskqueue_app::actions::ActionSettings;

/// File read when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "taskqueue.toml";

/// Settings for one `taskqueued` run.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub templates: TemplatesConfig,
    pub executor: ExecutorConfig,
    pub devices: DevicesConfig,
    pub logging: LoggingConfig,
}

/// Where template definition files live.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct TemplatesConfig {
    /// Read-only system templates.
    pub system_dir: PathBuf,
    /// User templates and the user catalog.
    pub user_dir: PathBuf,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Fallback poll period while waiting on a property.
    pub poll_interval_ms: u64,
    /// Period of the remaining-time message of a scheduled start.
    pub schedule_progress_secs: u64,
    /// Capacity of the executor event channel.
    pub event_capacity: usize,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DevicesConfig {
    /// Register the simulated observatory as the device runtime.
    pub simulated: bool,
    /// Busy→Ok delay of simulated writes.
    pub settle_delay_ms: u64,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `info,taskqueue_app=debug`.
    pub filter: String,
}

impl Config {
    /// Load the configuration file, apply environment overrides and
    /// validate the result.
    ///
    /// An explicitly named file must exist; the default one is optional.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if the
    /// resulting values are invalid.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let from_env = std::env::var_os("TASKQUEUE_CONFIG").map(PathBuf::from);
        let mut config = match explicit.map(Path::to_path_buf).or(from_env) {
            Some(path) => Self::from_file(&path, true)?,
            None => Self::from_file(Path::new(DEFAULT_CONFIG_FILE), false)?,
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &Path, required: bool) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound && !required => {
                Ok(Self::default())
            }
            Err(err) => Err(ConfigError::Io {
                path: path.to_path_buf(),
                source: err,
            }),
        }
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(val) = lookup("TASKQUEUE_SYSTEM_TEMPLATES") {
            self.templates.system_dir = PathBuf::from(val);
        }
        if let Some(val) = lookup("TASKQUEUE_USER_TEMPLATES") {
            self.templates.user_dir = PathBuf::from(val);
        }
        if let Some(ms) = lookup("TASKQUEUE_POLL_INTERVAL_MS").and_then(|v| v.parse().ok()) {
            self.executor.poll_interval_ms = ms;
        }
        if let Some(val) = lookup("TASKQUEUE_LOG") {
            self.logging.filter = val;
        }
        if let Some(val) = lookup("RUST_LOG") {
            self.logging.filter = val;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.templates.system_dir.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "templates.system_dir must not be empty".to_string(),
            ));
        }
        if self.templates.user_dir.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "templates.user_dir must not be empty".to_string(),
            ));
        }
        if self.executor.poll_interval_ms == 0 {
            return Err(ConfigError::Validation(
                "executor.poll_interval_ms must be non-zero".to_string(),
            ));
        }
        if self.executor.schedule_progress_secs == 0 {
            return Err(ConfigError::Validation(
                "executor.schedule_progress_secs must be non-zero".to_string(),
            ));
        }
        if self.executor.event_capacity == 0 {
            return Err(ConfigError::Validation(
                "executor.event_capacity must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn action_settings(&self) -> ActionSettings {
        ActionSettings {
            poll_interval: Duration::from_millis(self.executor.poll_interval_ms),
            schedule_progress_interval: Duration::from_secs(self.executor.schedule_progress_secs),
        }
    }

    #[must_use]
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.devices.settle_delay_ms)
    }
}

impl Default for TemplatesConfig {
    fn default() -> Self {
        Self {
            system_dir: PathBuf::from("data/templates/system"),
            user_dir: PathBuf::from("data/templates/user"),
        }
    }
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
            schedule_progress_secs: 30,
            event_capacity: 256,
        }
    }
}

impl Default for DevicesConfig {
    fn default() -> Self {
        Self {
            simulated: true,
            settle_delay_ms: 500,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

/// Why the settings could not be loaded.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("malformed settings file")]
    Parse(#[from] toml::de::Error),
    #[error("failed to read config file {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("rejected setting: {0}")]
    Validation(String),
}

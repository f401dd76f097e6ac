//! Logging configuration
//!
//! Values are layered with figment: built-in defaults, then an optional TOML
//! file, then `LOGWEAVE_` environment variables (nested keys split on `__`,
//! e.g. `LOGWEAVE_FILE__MAX_BACKUPS=5`).

use crate::console_sink::{SplitConsoleSink, DEFAULT_BOUNDARY};
use crate::errors::{LogError, LogResult};
use crate::file_sink::{FileSinkOptions, RotatingFileSink};
use crate::level::Level;
use crate::logger::Logger;
use crate::sink::LogSink;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;
const BYTES_PER_MB: u64 = 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: Level,
    #[serde(default)]
    pub include_caller: bool,
    #[serde(default)]
    pub console: ConsoleConfig,
    #[serde(default)]
    pub file: Option<FileConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsoleConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_boundary")]
    pub boundary: Level,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileConfig {
    pub path: PathBuf,
    #[serde(default = "default_dir_mode")]
    pub dir_mode: u32,
    #[serde(default = "default_file_mode")]
    pub file_mode: u32,
    /// Zero keeps backups regardless of age.
    #[serde(default)]
    pub max_age_days: u64,
    /// Zero keeps every backup.
    #[serde(default)]
    pub max_backups: usize,
    #[serde(default = "default_max_size_mb")]
    pub max_size_mb: u64,
}

fn default_level() -> Level {
    Level::Info
}

fn default_true() -> bool {
    true
}

fn default_boundary() -> Level {
    DEFAULT_BOUNDARY
}

fn default_dir_mode() -> u32 {
    0o755
}

fn default_file_mode() -> u32 {
    0o644
}

fn default_max_size_mb() -> u64 {
    100
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: default_level(),
            include_caller: false,
            console: ConsoleConfig::default(),
            file: None,
        }
    }
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        ConsoleConfig {
            enabled: true,
            boundary: default_boundary(),
        }
    }
}

impl FileConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileConfig {
            path: path.into(),
            dir_mode: default_dir_mode(),
            file_mode: default_file_mode(),
            max_age_days: 0,
            max_backups: 0,
            max_size_mb: default_max_size_mb(),
        }
    }

    pub fn to_options(&self) -> LogResult<FileSinkOptions> {
        let max_size = self
            .max_size_mb
            .checked_mul(BYTES_PER_MB)
            .ok_or_else(|| LogError::config("file.max_size_mb is too large"))?;
        let max_age = self
            .max_age_days
            .checked_mul(SECONDS_PER_DAY)
            .map(Duration::from_secs)
            .ok_or_else(|| LogError::config("file.max_age_days is too large"))?;

        Ok(FileSinkOptions::new(&self.path)
            .dir_mode(self.dir_mode)
            .file_mode(self.file_mode)
            .max_age(max_age)
            .max_backups(self.max_backups)
            .max_size(max_size))
    }
}

impl LoggingConfig {
    /// Layers defaults, the TOML file at `path` (if given) and the environment.
    pub fn load(path: Option<&Path>) -> LogResult<Self> {
        let mut figment = Figment::from(Serialized::defaults(LoggingConfig::default()));
        if let Some(path) = path {
            figment = figment.merge(Toml::file(path));
        }
        let figment = figment.merge(Env::prefixed("LOGWEAVE_").split("__"));
        Self::extract(figment)
    }

    /// Parses a TOML document on top of the defaults, without the environment.
    pub fn from_toml_str(toml: &str) -> LogResult<Self> {
        Self::extract(
            Figment::from(Serialized::defaults(LoggingConfig::default())).merge(Toml::string(toml)),
        )
    }

    fn extract(figment: Figment) -> LogResult<Self> {
        let config: LoggingConfig = figment.extract()?;

        if let Some(file) = &config.file {
            if file.path.as_os_str().is_empty() {
                return Err(LogError::config("file.path must be set"));
            }
            if file.max_size_mb == 0 {
                return Err(LogError::config("file.max_size_mb must be greater than zero"));
            }
        }

        Ok(config)
    }

    /// Builds the configured sinks: console low, console high, then file.
    pub fn build_sinks(&self) -> LogResult<Vec<Arc<dyn LogSink>>> {
        let mut sinks = Vec::new();
        if self.console.enabled {
            sinks.extend(SplitConsoleSink::with_boundary(self.console.boundary).sinks());
        }
        if let Some(file) = &self.file {
            sinks.push(Arc::new(RotatingFileSink::new(file.to_options()?)?) as Arc<dyn LogSink>);
        }
        Ok(sinks)
    }

    pub fn build_logger(&self) -> LogResult<Logger> {
        Ok(Logger::new(
            self.level,
            self.include_caller,
            self.build_sinks()?,
        ))
    }
}

//! `blanc.toml` settings and logging setup.
//!
//! ```toml
//! [store]
//! path = "jobs.json"   # JSON array of job records
//!
//! [log]
//! level = "info"       # overridden by RUST_LOG
//! file = "blanc.log"   # board mode logs here; CLI mode logs to stderr
//! ```

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use crate::core::error::BlancError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_level")]
    pub level: String,
    pub file: Option<PathBuf>,
}

fn default_store_path() -> PathBuf {
    PathBuf::from("jobs.json")
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            file: None,
        }
    }
}

impl Config {
    /// Missing file means defaults; a present but invalid file is an error.
    pub fn load(path: &Path) -> Result<Self, BlancError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path).map_err(|e| BlancError::Config {
            message: format!("cannot read {}: {e}", path.display()),
        })?;
        toml::from_str(&raw).map_err(|e| BlancError::Config {
            message: format!("{}: {e}", path.display()),
        })
    }
}

/// Where log output should go for the current surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTarget {
    Stderr,
    /// The alternate screen owns the terminal; only a log file is safe.
    FileOnly,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogSink<'a> {
    Stderr,
    File(&'a Path),
    Off,
}

/// CLI runs always log to stderr; the board only logs to a configured file.
pub fn log_sink(config: &LogConfig, target: LogTarget) -> LogSink<'_> {
    match (target, config.file.as_deref()) {
        (LogTarget::Stderr, _) => LogSink::Stderr,
        (LogTarget::FileOnly, Some(path)) => LogSink::File(path),
        (LogTarget::FileOnly, None) => LogSink::Off,
    }
}

pub fn init_logging(
    config: &LogConfig,
    verbose: bool,
    target: LogTarget,
) -> Result<(), BlancError> {
    let level = if verbose { "debug" } else { config.level.as_str() };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(|e| BlancError::Config {
            message: format!("invalid log level '{level}': {e}"),
        })?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    let result = match log_sink(config, target) {
        LogSink::Stderr => builder.with_writer(std::io::stderr).try_init(),
        LogSink::File(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| BlancError::Config {
                    message: format!("cannot open log file {}: {e}", path.display()),
                })?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
        }
        LogSink::Off => return Ok(()),
    };

    result.map_err(|e| BlancError::Config {
        message: format!("logging already initialized: {e}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().join("blanc.toml")).unwrap();
        assert_eq!(config.store.path, PathBuf::from("jobs.json"));
        assert_eq!(config.log.level, "info");
        assert!(config.log.file.is_none());
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blanc.toml");
        fs::write(&path, "[store]\npath = \"/srv/blanc/jobs.json\"\n").unwrap();
        let config = Config::load(&path).unwrap();
        assert_eq!(config.store.path, PathBuf::from("/srv/blanc/jobs.json"));
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn cli_logs_to_stderr_even_with_a_log_file() {
        let config = LogConfig {
            level: "info".to_string(),
            file: Some(PathBuf::from("blanc.log")),
        };
        assert_eq!(log_sink(&config, LogTarget::Stderr), LogSink::Stderr);
        assert_eq!(
            log_sink(&config, LogTarget::FileOnly),
            LogSink::File(Path::new("blanc.log"))
        );
        assert_eq!(log_sink(&LogConfig::default(), LogTarget::FileOnly), LogSink::Off);
    }

    #[test]
    fn invalid_toml_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blanc.toml");
        fs::write(&path, "[log\nlevel = 3").unwrap();
        assert!(matches!(Config::load(&path), Err(BlancError::Config { .. })));
    }
}

//! Logging setup for hosts embedding the data source core.
//!
//! Console output when attached to a terminal, console plus a daily rolling
//! file otherwise. Filters come from, in order: the explicit filter,
//! `LOGSHIP_LOG`, `RUST_LOG`, then a build-type default.

use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

use crate::error::{LogshipError, LogshipResult};

/// Environment variable holding the crate's log filter.
pub const LOG_ENV_VAR: &str = "LOGSHIP_LOG";

/// Prefix of rolled log files.
const LOG_FILE_PREFIX: &str = "logship";

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Directory for log files
    pub log_dir: PathBuf,
    /// Whether stdout is a terminal
    pub is_pty: bool,
    /// Explicit filter, overriding the environment
    pub log_filter: Option<String>,
}

impl LogConfig {
    /// Create a configuration writing files to `log_dir`.
    pub fn new(log_dir: PathBuf) -> Self {
        Self { log_dir, is_pty: atty::is(atty::Stream::Stdout), log_filter: None }
    }

    /// Set an explicit filter.
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = Some(filter.into());
        self
    }
}

/// Keeps the file writer alive. Dropping it flushes pending entries.
pub struct LoggingGuard {
    _worker_guard: Option<WorkerGuard>,
}

/// Install the global subscriber.
///
/// Falls back to console-only output if the log file cannot be opened. A
/// subscriber installed earlier by the host is left in place.
pub fn init_logging(config: LogConfig) -> LoggingGuard {
    if config.is_pty {
        return init_stdout_logging(config.log_filter.as_deref());
    }

    match init_file_logging(&config) {
        Ok(guard) => LoggingGuard { _worker_guard: Some(guard) },
        Err(e) => {
            eprintln!("Warning: file logging unavailable ({e}), logging to console only");
            init_stdout_logging(config.log_filter.as_deref())
        }
    }
}

/// Install the global subscriber with the default log directory.
pub fn init_logging_default() -> LoggingGuard {
    init_logging(LogConfig::new(log_dir()))
}

fn init_stdout_logging(filter: Option<&str>) -> LoggingGuard {
    let installed = tracing_subscriber::fmt()
        .with_env_filter(build_env_filter(filter))
        .with_target(false)
        .try_init();
    if installed.is_err() {
        tracing::debug!("Global subscriber already installed");
    }

    LoggingGuard { _worker_guard: None }
}

fn init_file_logging(config: &LogConfig) -> LogshipResult<WorkerGuard> {
    std::fs::create_dir_all(&config.log_dir)?;

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix("log")
        .build(&config.log_dir)
        .map_err(|e| LogshipError::config(format!("cannot open log file: {e}")))?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let writer = std::io::stdout.with_max_level(tracing::Level::INFO).and(non_blocking);

    tracing_subscriber::fmt()
        .with_writer(writer)
        .with_env_filter(build_env_filter(config.log_filter.as_deref()))
        .with_ansi(false)
        .with_target(true)
        .try_init()
        .map_err(|e| LogshipError::internal(format!("cannot install subscriber: {e}")))?;

    Ok(guard)
}

fn build_env_filter(custom_filter: Option<&str>) -> EnvFilter {
    if let Some(filter) = custom_filter {
        return EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new(default_log_filter()));
    }

    EnvFilter::try_from_env(LOG_ENV_VAR)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(default_log_filter()))
}

/// Default filter for the current build type.
pub fn default_log_filter() -> &'static str {
    #[cfg(debug_assertions)]
    {
        "info,logship_core=debug"
    }
    #[cfg(not(debug_assertions))]
    {
        "warn,logship_core=info"
    }
}

/// Default log directory, under the platform data directory.
pub fn log_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(LOG_FILE_PREFIX)
        .join("logs")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_dir_ends_with_logship_logs() {
        assert!(log_dir().ends_with("logship/logs"));
    }

    #[test]
    fn test_config_with_filter() {
        let config = LogConfig::new(PathBuf::from("/tmp/logs")).with_filter("trace");
        assert_eq!(config.log_filter.as_deref(), Some("trace"));
    }
}

//! Optional `tracing-subscriber` initialization for binaries embedding this crate.
//!
//! The upload core itself only ever emits `tracing` events (see `driver`); it never
//! initializes a subscriber. This module is a convenience for applications that want
//! the same file+stdout setup this codebase's other binaries use, without writing it
//! themselves.

use std::path::PathBuf;
use thiserror::Error;
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("failed to create log directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to create rolling file appender: {0}")]
    FileAppender(#[from] tracing_appender::rolling::InitError),
}

/// Configuration for the logging system.
pub struct LogConfig {
    /// Directory where log files will be stored, if `log_to_file` is set.
    pub log_dir: PathBuf,
    /// Prefix for log file names.
    pub file_prefix: String,
    /// Maximum number of log files to keep (rotation).
    pub max_files: usize,
    /// Whether to write logs to file in addition to stdout.
    pub log_to_file: bool,
    /// Log level filter string, used when `RUST_LOG` is unset.
    pub log_level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from("./logs"),
            file_prefix: "resumable-upload".to_string(),
            max_files: 5,
            log_to_file: false,
            log_level: "info".to_string(),
        }
    }
}

/// Guard that must be kept alive for the process lifetime to ensure file logging, if
/// enabled, flushes on shutdown.
pub struct LogGuard {
    _worker_guard: Option<tracing_appender::non_blocking::WorkerGuard>,
}

/// Initialize a `tracing-subscriber` registry with an env filter, a compact stdout
/// layer, and, if `config.log_to_file`, a daily-rotating file layer.
pub fn init_tracing(config: LogConfig) -> Result<LogGuard, LoggingError> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let stdout_layer = fmt::layer()
        .compact()
        .with_target(true)
        .with_line_number(true)
        .with_span_events(FmtSpan::NONE);

    if config.log_to_file {
        std::fs::create_dir_all(&config.log_dir).map_err(|source| LoggingError::CreateDir {
            path: config.log_dir.clone(),
            source,
        })?;

        let file_appender = tracing_appender::rolling::RollingFileAppender::builder()
            .rotation(tracing_appender::rolling::Rotation::DAILY)
            .filename_prefix(&config.file_prefix)
            .filename_suffix("log")
            .max_log_files(config.max_files)
            .build(&config.log_dir)?;
        let (non_blocking_file, worker_guard) = tracing_appender::non_blocking(file_appender);
        let file_layer = fmt::layer()
            .compact()
            .with_writer(non_blocking_file)
            .with_target(true)
            .with_ansi(false);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stdout_layer)
            .with(file_layer)
            .init();

        Ok(LogGuard {
            _worker_guard: Some(worker_guard),
        })
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stdout_layer)
            .init();

        Ok(LogGuard { _worker_guard: None })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_log_config() {
        let config = LogConfig::default();
        assert_eq!(config.file_prefix, "resumable-upload");
        assert_eq!(config.max_files, 5);
        assert!(!config.log_to_file);
    }
}

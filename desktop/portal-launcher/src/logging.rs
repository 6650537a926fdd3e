//! Logging setup with file rotation.

use portal_config::LogLevel;

use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    EnvFilter, fmt, prelude::__tracing_subscriber_SubscriberExt, util::SubscriberInitExt,
};

const LOG_FILE_PREFIX: &str = "portal-launcher";
const LOG_FILE_SUFFIX: &str = "log";
const MAX_LOG_FILES: usize = 7;

/// Live logging setup. Buffered file output is flushed when this is dropped,
/// so `main` holds it for the life of the process.
pub struct LoggingContext {
    logs_dir: PathBuf,
    _guard: WorkerGuard,
}

impl LoggingContext {
    /// Path to today's log file.
    pub fn current_log_path(&self) -> PathBuf {
        current_log_path(&self.logs_dir)
    }
}

/// Setup logging with console and rotating file output.
///
/// # Log Layers
/// - Console: Human-readable, colored output
/// - File: plain text, daily rotation, 7-day retention
///
/// `RUST_LOG` overrides `level` when set.
pub fn setup_logging(
    logs_dir: &Path,
    level: LogLevel,
) -> Result<LoggingContext, Box<dyn std::error::Error>> {
    std::fs::create_dir_all(logs_dir)?;

    let console_layer = fmt::layer()
        .with_target(true)
        .with_level(true)
        .with_ansi(true);

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .max_log_files(MAX_LOG_FILES)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix(LOG_FILE_SUFFIX)
        .build(logs_dir)?;
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_target(true)
        .with_level(true)
        .with_ansi(false)
        .with_writer(file_writer);

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()?;

    Ok(LoggingContext {
        logs_dir: logs_dir.to_path_buf(),
        _guard: guard,
    })
}

/// Get path to the current log file.
pub fn current_log_path(logs_dir: &Path) -> PathBuf {
    let today = chrono::Utc::now().format("%Y-%m-%d");
    logs_dir.join(format!("{LOG_FILE_PREFIX}.{today}.{LOG_FILE_SUFFIX}"))
}

//! Logging setup
//!
//! Console output is compact text or JSON. A non-blocking writer can mirror
//! every event into a log file; its guard has to outlive the program's last
//! log line.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*, util::TryInitError};

/// Environment variable holding the log filter
pub const LOG_FILTER_ENV: &str = "GLITCHER_LOG";
/// Environment variable selecting the console format (`json`)
pub const LOG_FORMAT_ENV: &str = "GLITCHER_LOG_FORMAT";

const DEFAULT_LOG_FILE: &str = "reality-glitcher.log";

/// Flushes the log file when dropped
pub type LogGuard = tracing_appender::non_blocking::WorkerGuard;

#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("cannot open log file: {0}")]
    File(#[from] std::io::Error),
    #[error("a global subscriber is already installed: {0}")]
    Init(#[from] TryInitError),
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub console_enabled: bool,
    /// Emit console events as JSON lines
    pub json_format: bool,
    pub file_enabled: bool,
    /// Defaults to `reality-glitcher.log` in the working directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<PathBuf>,
    /// Filter used when neither `GLITCHER_LOG` nor `RUST_LOG` is set
    pub default_level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            console_enabled: true,
            json_format: false,
            file_enabled: false,
            file_path: None,
            default_level: "info".to_string(),
        }
    }
}

impl LogConfig {
    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_env(LOG_FILTER_ENV)
            .or_else(|_| EnvFilter::try_from_default_env())
            .unwrap_or_else(|_| EnvFilter::new(&self.default_level))
    }

    /// JSON console output, honouring `GLITCHER_LOG_FORMAT`
    fn console_json(&self) -> bool {
        match std::env::var(LOG_FORMAT_ENV) {
            Ok(format) => format.eq_ignore_ascii_case("json"),
            Err(_) => self.json_format,
        }
    }

    pub fn log_file(&self) -> PathBuf {
        self.file_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE))
    }
}

/// Install the global subscriber
///
/// Returns the file writer's guard when file logging is enabled.
pub fn init_logging(config: &LogConfig) -> Result<Option<LogGuard>, LoggingError> {
    let json = config.console_enabled && config.console_json();

    let compact_layer = (config.console_enabled && !json)
        .then(|| fmt::layer().with_target(true).compact());
    let json_layer = json.then(|| {
        fmt::layer()
            .json()
            .with_thread_names(true)
            .with_file(true)
            .with_line_number(true)
    });

    let (file_layer, guard) = if config.file_enabled {
        let file = std::fs::File::create(config.log_file())?;
        let (writer, guard) = tracing_appender::non_blocking(file);
        let layer = fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .with_thread_names(true)
            .with_line_number(true);
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(config.filter())
        .with(compact_layer)
        .with(json_layer)
        .with(file_layer)
        .try_init()?;

    tracing::debug!(
        json,
        file = ?config.file_enabled.then(|| config.log_file()),
        "Logging initialized"
    );

    Ok(guard)
}

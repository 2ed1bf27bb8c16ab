//! Tracing subscriber setup
//!
//! The library itself only emits `tracing` events: `debug!` for stream and
//! session lifecycle, `warn!` for anomalies and skipped records. Binaries
//! that want them printed call [`init_subscriber`] once at startup.
//!
//! ```rust,ignore
//! use ui_message_stream::observability::{init_subscriber, OutputFormat, SubscriberConfig};
//!
//! let _guard = init_subscriber(
//!     SubscriberConfig::default()
//!         .with_log_level(tracing::Level::DEBUG)
//!         .with_output_format(OutputFormat::Json),
//! )?;
//! ```

use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::error::{Result, StreamError};

/// Output format for log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable text format
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = StreamError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(StreamError::Configuration(format!(
                "invalid log format: {other}. Valid options: text, json"
            ))),
        }
    }
}

/// Configuration for the tracing subscriber
#[derive(Debug, Clone)]
pub struct SubscriberConfig {
    pub log_level: tracing::Level,
    pub output_format: OutputFormat,
    /// Write to this file instead of stdout
    pub log_file: Option<PathBuf>,
}

impl Default for SubscriberConfig {
    fn default() -> Self {
        Self {
            log_level: tracing::Level::INFO,
            output_format: OutputFormat::Text,
            log_file: None,
        }
    }
}

impl SubscriberConfig {
    /// Debug level, text output.
    pub fn debug() -> Self {
        Self {
            log_level: tracing::Level::DEBUG,
            ..Default::default()
        }
    }

    /// Warnings only, JSON lines written to `log_file`.
    pub fn production(log_file: PathBuf) -> Self {
        Self {
            log_level: tracing::Level::WARN,
            output_format: OutputFormat::Json,
            log_file: Some(log_file),
        }
    }

    pub fn with_log_level(mut self, level: tracing::Level) -> Self {
        self.log_level = level;
        self
    }

    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = format;
        self
    }

    pub fn with_log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_file = Some(path.into());
        self
    }

    /// Read `UI_STREAM_LOG_LEVEL`, `UI_STREAM_LOG_FORMAT` and
    /// `UI_STREAM_LOG_FILE` on top of the defaults.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Ok(level) = std::env::var("UI_STREAM_LOG_LEVEL") {
            config.log_level = parse_level(&level)?;
        }
        if let Ok(format) = std::env::var("UI_STREAM_LOG_FORMAT") {
            config.output_format = format.parse()?;
        }
        if let Ok(path) = std::env::var("UI_STREAM_LOG_FILE") {
            config.log_file = Some(PathBuf::from(path));
        }
        Ok(config)
    }

    fn filter(&self) -> EnvFilter {
        let level = self.log_level.as_str().to_lowercase();
        EnvFilter::new(format!("ui_message_stream={level}"))
    }
}

fn parse_level(level: &str) -> Result<tracing::Level> {
    level.parse().map_err(|_| {
        StreamError::Configuration(format!(
            "invalid log level: {level}. Valid options: trace, debug, info, warn, error"
        ))
    })
}

/// Install the global subscriber.
///
/// Returns the file writer's guard when `log_file` is set; keep it alive for
/// the lifetime of the program or buffered lines are lost. Calling this when
/// a subscriber is already installed is not an error.
pub fn init_subscriber(config: SubscriberConfig) -> Result<Option<WorkerGuard>> {
    let filter = config.filter();

    let (init_result, guard) = match &config.log_file {
        Some(path) => {
            let (dir, file_name) = split_log_path(path)?;
            let appender = tracing_appender::rolling::never(dir, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let builder = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(true)
                .with_ansi(false)
                .with_writer(writer);
            let result = match config.output_format {
                OutputFormat::Json => builder.json().try_init(),
                OutputFormat::Text => builder.try_init(),
            };
            (result, Some(guard))
        }
        None => {
            let builder = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(true);
            let result = match config.output_format {
                OutputFormat::Json => builder.json().try_init(),
                OutputFormat::Text => builder.try_init(),
            };
            (result, None)
        }
    };

    match init_result {
        Ok(()) => Ok(guard),
        Err(e) => {
            let message = e.to_string();
            if message.contains("global default trace dispatcher has already been set") {
                Ok(None)
            } else {
                Err(StreamError::Configuration(format!(
                    "failed to initialize tracing: {message}"
                )))
            }
        }
    }
}

fn split_log_path(path: &Path) -> Result<(&Path, &std::ffi::OsStr)> {
    let file_name = path.file_name().ok_or_else(|| {
        StreamError::Configuration(format!("log file path has no file name: {}", path.display()))
    })?;
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    Ok((dir, file_name))
}

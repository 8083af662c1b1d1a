//! Structured logging setup using tracing
//!
//! Console output always; JSON lines to `<local_path>/phiscrub.log` when
//! local logging is enabled. `RUST_LOG` overrides the configured level.
//!
//! # Example
//!
//! ```no_run
//! use phiscrub::logging::init_logging;
//! use phiscrub::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//! ```

use crate::config::LoggingConfig;
use crate::domain::{PhiScrubError, Result, RunId, SessionId};
use std::str::FromStr;
use tracing::{Level, Span};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// File name prefix of the local log
pub const LOG_FILE_NAME: &str = "phiscrub.log";

// HTTP client internals are noisy at debug
const QUIET_TARGETS: [&str; 3] = ["hyper=warn", "reqwest=warn", "rustls=warn"];

/// Local log file rotation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogRotation {
    Daily,
    Hourly,
    Never,
}

impl LogRotation {
    pub const VALUES: [&'static str; 3] = ["daily", "hourly", "never"];

    fn rotation(self) -> Rotation {
        match self {
            Self::Daily => Rotation::DAILY,
            Self::Hourly => Rotation::HOURLY,
            Self::Never => Rotation::NEVER,
        }
    }
}

impl FromStr for LogRotation {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "daily" => Ok(Self::Daily),
            "hourly" => Ok(Self::Hourly),
            "never" => Ok(Self::Never),
            other => Err(format!(
                "Invalid logging.local_rotation '{other}'. Must be one of: {}",
                Self::VALUES.join(", ")
            )),
        }
    }
}

/// Keeps the non-blocking file writer alive; drop it last so buffered
/// lines are flushed
pub struct LoggingGuard {
    _file_guard: Option<WorkerGuard>,
}

/// Install the global subscriber
///
/// Can only succeed once per process.
///
/// # Errors
///
/// Returns [`PhiScrubError::Configuration`] for an unknown level or
/// rotation, or when the log directory cannot be created.
pub fn init_logging(log_level_str: &str, config: &LoggingConfig) -> Result<LoggingGuard> {
    let log_level = parse_log_level(log_level_str)?;
    let rotation = config
        .local_rotation
        .parse::<LogRotation>()
        .map_err(PhiScrubError::Configuration)?;

    let mut layers = Vec::new();

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_filter(build_filter(log_level));
    layers.push(console_layer.boxed());

    let file_guard = if config.local_enabled {
        std::fs::create_dir_all(&config.local_path).map_err(|e| {
            PhiScrubError::Configuration(format!(
                "Failed to create log directory {}: {}",
                config.local_path, e
            ))
        })?;

        let file_appender =
            RollingFileAppender::new(rotation.rotation(), &config.local_path, LOG_FILE_NAME);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        let file_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_target(true)
            .with_writer(non_blocking)
            .with_filter(build_filter(log_level));
        layers.push(file_layer.boxed());
        Some(guard)
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(layers)
        .try_init()
        .map_err(|e| PhiScrubError::Configuration(format!("Logging already initialized: {e}")))?;

    tracing::info!(
        level = %log_level,
        local_enabled = config.local_enabled,
        local_path = %config.local_path,
        rotation = ?rotation,
        "Logging initialized"
    );

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}

/// Span wrapping one de-identification run of a session
///
/// Every log line emitted inside it carries `run_id` and `session`.
pub fn run_span(run_id: &RunId, session: &SessionId) -> Span {
    tracing::info_span!("deidentify", run_id = %run_id, session = %session)
}

fn build_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let mut directives = format!("phiscrub={}", level.as_str().to_lowercase());
        for target in QUIET_TARGETS {
            directives.push(',');
            directives.push_str(target);
        }
        EnvFilter::new(directives)
    })
}

fn parse_log_level(level_str: &str) -> Result<Level> {
    Level::from_str(level_str.trim()).map_err(|_| {
        PhiScrubError::Configuration(format!(
            "Invalid log level: {level_str}. Must be one of: trace, debug, info, warn, error"
        ))
    })
}

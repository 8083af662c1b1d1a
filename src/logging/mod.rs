//! Logging and observability
//!
//! This module provides structured logging with support for:
//! - Console output with configurable log levels
//! - JSON-formatted local file logging with rotation
//!
//! Log lines carry tags, entry names, counts and categories. Field values
//! never reach the log.
//!
//! # Example
//!
//! ```no_run
//! use phiscrub::logging::init_logging;
//! use phiscrub::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!(session = "MR-0042", "Application started");
//! ```

pub mod structured;

// Re-export commonly used items
pub use structured::{init_logging, run_span, LogRotation, LoggingGuard};

/// Log an entry the orchestrator does not process
///
/// # Example
///
/// ```no_run
/// use phiscrub::log_entry_skipped;
///
/// log_entry_skipped!("MR-0042", "CT@deidentified", "derivative entry");
/// ```
#[macro_export]
macro_rules! log_entry_skipped {
    ($session:expr, $entry:expr, $reason:expr) => {
        tracing::info!(
            session = %$session,
            entry = %$entry,
            reason = %$reason,
            "Skipping entry"
        );
    };
}

/// Log a record that could not be transformed
///
/// # Example
///
/// ```no_run
/// use phiscrub::log_record_failed;
/// use phiscrub::domain::PhiScrubError;
///
/// let error = PhiScrubError::Codec("truncated element".to_string());
/// log_record_failed!("CT/DICOM", "1.dcm", &error);
/// ```
#[macro_export]
macro_rules! log_record_failed {
    ($entry:expr, $file:expr, $error:expr) => {
        tracing::error!(
            entry = %$entry,
            file = %$file,
            error = %$error,
            "Failed to de-identify record"
        );
    };
}

/// Log the completion of a session run
///
/// # Example
///
/// ```no_run
/// use phiscrub::log_deidentify_complete;
/// use std::time::Duration;
///
/// log_deidentify_complete!("MR-0042", 3, Duration::from_secs(4));
/// ```
#[macro_export]
macro_rules! log_deidentify_complete {
    ($session:expr, $derivatives:expr, $duration:expr) => {
        tracing::info!(
            session = %$session,
            derivatives = $derivatives,
            duration_ms = $duration.as_millis(),
            "Session de-identified"
        );
    };
}

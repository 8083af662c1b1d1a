//! Domain error types
//!
//! This module defines the error hierarchy for phiscrub.
//! All errors are domain-specific and don't expose third-party types.

use thiserror::Error;

/// Main phiscrub error type
///
/// This is the primary error type used throughout the library. Stage-level
/// failures (detection, recognition, storage) each have their own variant so
/// callers can decide which ones to tolerate.
#[derive(Debug, Error)]
pub enum PhiScrubError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A pattern detector failed while scanning text
    #[error("Detection error: {0}")]
    Detection(String),

    /// An entity recognizer (NER model) failed
    #[error("Entity recognition error: {0}")]
    Recognition(String),

    /// Record store errors (generic)
    #[error("Record store error: {0}")]
    Store(String),

    /// The requested session does not exist or cannot be listed
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// The requested entry does not exist in the session
    #[error("Entry not found: {0}")]
    EntryNotFound(String),

    /// An entry with the same name already exists
    #[error("Entry already exists: {0}")]
    EntryExists(String),

    /// Image encoding/decoding errors
    #[error("Codec error: {0}")]
    Codec(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Generic errors with context
    #[error("{0}")]
    Other(String),
}

impl PhiScrubError {
    /// Whether this error should abort a whole de-identification run
    ///
    /// Everything below session level is isolated by the orchestrator, except
    /// recognition failures which surface according to the NER failure policy.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            PhiScrubError::SessionNotFound(_)
                | PhiScrubError::Recognition(_)
                | PhiScrubError::Configuration(_)
        )
    }
}

// Conversion from std::io::Error
impl From<std::io::Error> for PhiScrubError {
    fn from(err: std::io::Error) -> Self {
        PhiScrubError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for PhiScrubError {
    fn from(err: serde_json::Error) -> Self {
        PhiScrubError::Serialization(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for PhiScrubError {
    fn from(err: toml::de::Error) -> Self {
        PhiScrubError::Configuration(format!("TOML parse error: {err}"))
    }
}

// Conversion from HTTP client errors (recognizer endpoints)
impl From<reqwest::Error> for PhiScrubError {
    fn from(err: reqwest::Error) -> Self {
        PhiScrubError::Recognition(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PhiScrubError::Configuration("Invalid config".to_string());
        assert_eq!(err.to_string(), "Configuration error: Invalid config");

        let err = PhiScrubError::SessionNotFound("MR-0042".to_string());
        assert_eq!(err.to_string(), "Session not found: MR-0042");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let err: PhiScrubError = io_err.into();
        assert!(matches!(err, PhiScrubError::Io(_)));
    }

    #[test]
    fn test_serde_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let err: PhiScrubError = json_err.into();
        assert!(matches!(err, PhiScrubError::Serialization(_)));
    }

    #[test]
    fn test_toml_error_conversion() {
        let toml_err = toml::from_str::<toml::Value>("invalid = toml = syntax").unwrap_err();
        let err: PhiScrubError = toml_err.into();
        assert!(matches!(err, PhiScrubError::Configuration(_)));
        assert!(err.to_string().contains("TOML parse error"));
    }

    #[test]
    fn test_fatal_classification() {
        assert!(PhiScrubError::SessionNotFound("s".into()).is_fatal());
        assert!(PhiScrubError::Recognition("model down".into()).is_fatal());
        assert!(!PhiScrubError::Detection("backtrack limit".into()).is_fatal());
        assert!(!PhiScrubError::EntryNotFound("e".into()).is_fatal());
        assert!(!PhiScrubError::Codec("bad file".into()).is_fatal());
    }

    #[test]
    fn test_error_implements_std_error() {
        let err = PhiScrubError::Validation("Test error".to_string());
        let _: &dyn std::error::Error = &err;
    }
}

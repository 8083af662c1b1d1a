//! Configuration schema types
//!
//! This module defines the configuration structure for phiscrub.

use crate::deidentification::config::{AuditConfig, DeidentificationConfig, NerConfig};
use crate::logging::structured::LogRotation;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main phiscrub configuration
///
/// This is the root configuration structure that maps to the TOML file.
/// Every section has defaults, so an empty file is a valid configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PhiScrubConfig {
    /// Application-level settings
    #[serde(default)]
    pub application: ApplicationConfig,

    /// Record store location
    #[serde(default)]
    pub store: StoreConfig,

    /// Detection and transformation settings
    #[serde(default)]
    pub deidentification: DeidentificationConfig,

    /// Named-entity recognizers
    #[serde(default)]
    pub ner: NerConfig,

    /// Audit trail
    #[serde(default)]
    pub audit: AuditConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl PhiScrubConfig {
    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid
    pub fn validate(&self) -> Result<(), String> {
        self.application.validate()?;
        self.store.validate()?;
        self.deidentification
            .validate()
            .map_err(|e| format!("deidentification: {e:#}"))?;
        self.ner.validate().map_err(|e| format!("ner: {e:#}"))?;
        self.audit.validate().map_err(|e| format!("audit: {e:#}"))?;
        self.logging.validate()?;
        Ok(())
    }
}

/// Application-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Dry run mode (process everything, write nothing to the store)
    #[serde(default)]
    pub dry_run: bool,
}

impl ApplicationConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.as_str()) {
            return Err(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            ));
        }
        Ok(())
    }
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            dry_run: false,
        }
    }
}

/// Filesystem record store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Directory holding one sub-directory per session
    #[serde(default = "default_store_root")]
    pub root: PathBuf,
}

impl StoreConfig {
    fn validate(&self) -> Result<(), String> {
        if self.root.as_os_str().is_empty() {
            return Err("store.root cannot be empty".to_string());
        }
        Ok(())
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root: default_store_root(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Enable local file logging
    #[serde(default)]
    pub local_enabled: bool,

    /// Local log directory
    #[serde(default = "default_local_path")]
    pub local_path: String,

    /// Log rotation strategy (daily, hourly, never)
    #[serde(default = "default_local_rotation")]
    pub local_rotation: String,
}

impl LoggingConfig {
    fn validate(&self) -> Result<(), String> {
        self.local_rotation.parse::<LogRotation>()?;

        if self.local_enabled && self.local_path.is_empty() {
            return Err("logging.local_path cannot be empty when local logging is enabled".to_string());
        }

        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            local_enabled: false,
            local_path: default_local_path(),
            local_rotation: default_local_rotation(),
        }
    }
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_store_root() -> PathBuf {
    PathBuf::from("./data/sessions")
}

fn default_local_path() -> String {
    "./logs".to_string()
}

fn default_local_rotation() -> String {
    "daily".to_string()
}

//! Configuration management for phiscrub.
//!
//! This module provides TOML-based configuration loading, parsing, and validation.
//!
//! # Overview
//!
//! phiscrub uses TOML configuration files with support for:
//! - Environment variable substitution (`${VAR_NAME}`)
//! - `PHISCRUB_*` environment overrides
//! - Default values for every setting
//! - Validation per section
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use phiscrub::config::load_config;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("phiscrub.toml")?;
//!
//! println!("Store root: {}", config.store.root.display());
//! println!("Score threshold: {}", config.deidentification.score_threshold);
//! println!("Recognizers: {}", config.ner.recognizers.len());
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration Structure
//!
//! - [`ApplicationConfig`] - Log level and dry-run switch
//! - [`StoreConfig`] - Filesystem record store root
//! - [`DeidentificationConfig`] - Threshold, placeholders, pattern library, deny lists
//! - [`NerConfig`] - Recognizers and failure policy
//! - [`AuditConfig`] - Audit trail
//! - [`LoggingConfig`] - Logging configuration
//!
//! # Example Configuration
//!
//! ```toml
//! [application]
//! log_level = "info"
//!
//! [store]
//! root = "/srv/research-store"
//!
//! [deidentification]
//! score_threshold = 0.5
//! destroy_pixels = true
//! use_transformers = true
//!
//! [ner]
//! failure_policy = "fail_fast"
//!
//! [[ner.recognizers]]
//! kind = "http"
//! name = "clinical-ner"
//! endpoint = "https://ner.example.org/models/clinical"
//! api_token = "${PHISCRUB_NER_TOKEN}"
//! ```

pub mod loader;
pub mod schema;
pub mod secret;

// Re-export commonly used types
pub use crate::deidentification::config::{
    AuditConfig, DeidentificationConfig, DenyListFile, NerConfig, RecognizerConfig,
};
pub use loader::{load_config, parse_config};
pub use schema::{ApplicationConfig, LoggingConfig, PhiScrubConfig, StoreConfig};
pub use secret::{secret_string, secret_string_opt, SecretString, SecretValue};

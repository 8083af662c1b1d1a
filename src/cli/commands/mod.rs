//! CLI command implementations
//!
//! This module contains all CLI command implementations.

pub mod count;
pub mod deidentify;
pub mod scan;
pub mod validate;

use crate::config::{load_config, PhiScrubConfig};
use std::path::Path;

/// Load the configuration file, or defaults when it does not exist
///
/// Commands that can run without a configuration file use this; a file that
/// exists but fails to load is still an error.
pub(crate) fn load_config_or_default(config_path: &str) -> crate::domain::Result<PhiScrubConfig> {
    if Path::new(config_path).exists() {
        load_config(config_path)
    } else {
        tracing::debug!(config_path = %config_path, "Configuration file not found, using defaults");
        Ok(PhiScrubConfig::default())
    }
}

//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::PhiScrubConfig;
use crate::domain::errors::PhiScrubError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (${VAR} syntax)
/// 3. Parses the TOML into PhiScrubConfig
/// 4. Applies environment variable overrides (PHISCRUB_* prefix)
/// 5. Validates the configuration
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Errors
///
/// Returns [`PhiScrubError::Configuration`] if:
/// - File cannot be read
/// - TOML parsing fails
/// - A referenced environment variable is not set
/// - An override value cannot be parsed
/// - Configuration validation fails
///
/// # Examples
///
/// ```no_run
/// use phiscrub::config::loader::load_config;
///
/// let config = load_config("phiscrub.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<PhiScrubConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(PhiScrubError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        PhiScrubError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    parse_config(&contents)
}

/// Parses, overrides and validates configuration text
///
/// Same as [`load_config`] without the file access.
pub fn parse_config(contents: &str) -> Result<PhiScrubConfig> {
    let contents = substitute_env_vars(contents)?;

    let mut config: PhiScrubConfig = toml::from_str(&contents)
        .map_err(|e| PhiScrubError::Configuration(format!("Failed to parse TOML: {}", e)))?;

    apply_env_overrides(&mut config)?;

    config.validate().map_err(|e| {
        PhiScrubError::Configuration(format!("Configuration validation failed: {}", e))
    })?;

    Ok(config)
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// Comment lines are copied untouched.
///
/// # Errors
///
/// Returns an error if a referenced environment variable is not set
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
        .map_err(|e| PhiScrubError::Configuration(format!("Invalid substitution pattern: {e}")))?;
    let mut result = String::new();
    let mut missing_vars: Vec<String> = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            result.push_str(line);
            result.push('\n');
            continue;
        }

        let mut processed_line = line.to_string();
        for cap in re.captures_iter(line) {
            let var_name = &cap[1];
            match std::env::var(var_name) {
                Ok(value) => {
                    let placeholder = format!("${{{}}}", var_name);
                    processed_line = processed_line.replace(&placeholder, &value);
                }
                Err(_) => {
                    if !missing_vars.iter().any(|v| v == var_name) {
                        missing_vars.push(var_name.to_string());
                    }
                }
            }
        }
        result.push_str(&processed_line);
        result.push('\n');
    }

    if !missing_vars.is_empty() {
        return Err(PhiScrubError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(result)
}

/// Applies environment variable overrides using PHISCRUB_* prefix
///
/// Environment variables follow the pattern: PHISCRUB_<SECTION>_<KEY>
/// For example: PHISCRUB_STORE_ROOT, PHISCRUB_DEIDENTIFICATION_SCORE_THRESHOLD
fn apply_env_overrides(config: &mut PhiScrubConfig) -> Result<()> {
    // Application overrides
    if let Ok(val) = std::env::var("PHISCRUB_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }
    if let Ok(val) = std::env::var("PHISCRUB_APPLICATION_DRY_RUN") {
        config.application.dry_run = val.parse().map_err(|_| {
            PhiScrubError::Configuration(format!("Invalid PHISCRUB_APPLICATION_DRY_RUN value: {val}"))
        })?;
    }

    // Store overrides
    if let Ok(val) = std::env::var("PHISCRUB_STORE_ROOT") {
        config.store.root = PathBuf::from(val);
    }

    // De-identification and audit overrides
    config
        .deidentification
        .apply_env_overrides()
        .map_err(|e| PhiScrubError::Configuration(format!("{e:#}")))?;
    config
        .audit
        .apply_env_overrides()
        .map_err(|e| PhiScrubError::Configuration(format!("{e:#}")))?;

    // Logging overrides
    if let Ok(val) = std::env::var("PHISCRUB_LOGGING_LOCAL_ENABLED") {
        config.logging.local_enabled = val.parse().unwrap_or(false);
    }
    if let Ok(val) = std::env::var("PHISCRUB_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_substitute_env_vars() {
        std::env::set_var("PHISCRUB_TEST_SUBST_TOKEN", "test_value");
        let input = "api_token = \"${PHISCRUB_TEST_SUBST_TOKEN}\"";
        let result = substitute_env_vars(input).unwrap();
        assert_eq!(result, "api_token = \"test_value\"\n");
        std::env::remove_var("PHISCRUB_TEST_SUBST_TOKEN");
    }

    #[test]
    fn test_substitute_env_vars_missing() {
        std::env::remove_var("PHISCRUB_TEST_MISSING_VAR");
        let input = "api_token = \"${PHISCRUB_TEST_MISSING_VAR}\"";
        let err = substitute_env_vars(input).unwrap_err();
        assert!(err.to_string().contains("PHISCRUB_TEST_MISSING_VAR"));
    }

    #[test]
    fn test_substitute_env_vars_skips_comments() {
        std::env::remove_var("PHISCRUB_TEST_COMMENTED_VAR");
        let input = "# api_token = \"${PHISCRUB_TEST_COMMENTED_VAR}\"\nroot = \"/srv\"";
        let result = substitute_env_vars(input).unwrap();
        assert!(result.contains("${PHISCRUB_TEST_COMMENTED_VAR}"));
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = load_config("nonexistent.toml");
        assert!(matches!(result, Err(PhiScrubError::Configuration(_))));
    }

    #[test]
    fn test_load_config_valid() {
        let toml_content = r#"
[application]
log_level = "info"

[deidentification]
score_threshold = 0.6
destroy_pixels = true

[ner]
failure_policy = "fail_fast"
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.deidentification.score_threshold, 0.6);
        assert!(config.ner.recognizers.is_empty());
    }

    #[test]
    fn test_load_config_invalid_value() {
        let toml_content = r#"
[deidentification]
score_threshold = 2.0
"#;

        let err = parse_config(toml_content).unwrap_err();
        assert!(err.to_string().contains("validation failed"));
    }

    #[test]
    fn test_load_config_malformed_toml() {
        let err = parse_config("[deidentification\nscore_threshold = ").unwrap_err();
        assert!(err.to_string().contains("Failed to parse TOML"));
    }

    #[test]
    fn test_env_overrides() {
        std::env::set_var("PHISCRUB_STORE_ROOT", "/tmp/phiscrub-override-root");
        std::env::set_var("PHISCRUB_LOGGING_LOCAL_PATH", "/tmp/phiscrub-override-logs");

        let config = parse_config("[store]\nroot = \"/srv/sessions\"\n").unwrap();

        std::env::remove_var("PHISCRUB_STORE_ROOT");
        std::env::remove_var("PHISCRUB_LOGGING_LOCAL_PATH");

        assert_eq!(config.store.root, PathBuf::from("/tmp/phiscrub-override-root"));
        assert_eq!(config.logging.local_path, "/tmp/phiscrub-override-logs");
    }
}

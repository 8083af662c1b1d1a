//! Validate config command implementation
//!
//! This module implements the `validate-config` command for validating
//! the phiscrub configuration file.

use crate::cli::exit_code;
use crate::config::{load_config, RecognizerConfig};
use crate::deidentification::Deidentifier;
use clap::Args;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        // load_config validates every section
        let config = match load_config(config_path) {
            Ok(c) => {
                println!("✅ Configuration file loaded successfully");
                c
            }
            Err(e) => {
                println!("❌ Failed to load configuration file");
                println!("   Error: {e}");
                return Ok(exit_code::CONFIGURATION);
            }
        };

        // Compile patterns and load word lists the way a run would
        if let Err(e) = Deidentifier::new(&config.deidentification, &config.ner, &config.audit) {
            println!("❌ Failed to build de-identification pipeline");
            println!("   Error: {e:#}");
            println!();
            return Ok(exit_code::CONFIGURATION);
        }

        println!("✅ Configuration is valid");
        println!();
        println!("Configuration Summary:");
        println!("  Log Level: {}", config.application.log_level);
        println!("  Dry Run: {}", config.application.dry_run);
        println!("  Store Root: {}", config.store.root.display());
        println!(
            "  Score Threshold: {}",
            config.deidentification.score_threshold
        );
        println!(
            "  Destroy Pixels: {}",
            config.deidentification.destroy_pixels
        );
        println!(
            "  Use Transformers: {}",
            config.deidentification.use_transformers
        );
        println!(
            "  Pattern Library: {}",
            config
                .deidentification
                .pattern_library
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "built-in".to_string())
        );
        println!("  Deny Lists: {}", config.deidentification.deny_lists.len());
        println!("  NER Failure Policy: {:?}", config.ner.failure_policy);
        for recognizer in &config.ner.recognizers {
            match recognizer {
                RecognizerConfig::Http { name, endpoint, .. } => {
                    println!("    - {name} (http: {endpoint})");
                }
                RecognizerConfig::Gazetteer { name, path, .. } => {
                    println!("    - {name} (gazetteer: {})", path.display());
                }
            }
        }
        if config.audit.enabled {
            println!("  Audit Log: {}", config.audit.log_path.display());
        } else {
            println!("  Audit Log: disabled");
        }
        println!();

        Ok(exit_code::SUCCESS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_valid_config() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[deidentification]\nscore_threshold = 0.4").unwrap();

        let code = ValidateArgs {}
            .execute(file.path().to_str().unwrap())
            .await
            .unwrap();
        assert_eq!(code, exit_code::SUCCESS);
    }

    #[tokio::test]
    async fn test_missing_config_file() {
        let code = ValidateArgs {}
            .execute("/nonexistent/phiscrub.toml")
            .await
            .unwrap();
        assert_eq!(code, exit_code::CONFIGURATION);
    }

    #[tokio::test]
    async fn test_invalid_recognizer() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[[ner.recognizers]]\nkind = \"http\"\nname = \"x\"\nendpoint = \"not a url\""
        )
        .unwrap();

        let code = ValidateArgs {}
            .execute(file.path().to_str().unwrap())
            .await
            .unwrap();
        assert_eq!(code, exit_code::CONFIGURATION);
    }
}

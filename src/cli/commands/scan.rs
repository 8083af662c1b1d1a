//! Scan command implementation
//!
//! This module implements the `scan` command, a redaction preview for a
//! single piece of text. Nothing is read from or written to the store.

use super::load_config_or_default;
use crate::cli::exit_code;
use crate::config::AuditConfig;
use crate::deidentification::Deidentifier;
use clap::Args;

/// Arguments for the scan command
#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Text to analyse
    pub text: String,

    /// Override the detector score threshold (0.0 - 1.0)
    #[arg(long, value_name = "SCORE")]
    pub score_threshold: Option<f32>,

    /// Also run the configured NER recognizers
    #[arg(long)]
    pub use_transformers: bool,
}

impl ScanArgs {
    /// Execute the scan command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let mut config = match load_config_or_default(config_path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("❌ Failed to load configuration: {e}");
                return Ok(exit_code::CONFIGURATION);
            }
        };

        if let Some(threshold) = self.score_threshold {
            config.deidentification.score_threshold = threshold;
        }
        if let Err(e) = config.deidentification.validate() {
            eprintln!("❌ Invalid settings: {e:#}");
            return Ok(exit_code::CONFIGURATION);
        }

        // Previews never write audit lines
        let deidentifier = match Deidentifier::new(
            &config.deidentification,
            &config.ner,
            &AuditConfig::default(),
        ) {
            Ok(d) => d,
            Err(e) => {
                eprintln!("❌ Failed to initialize pipeline: {e:#}");
                return Ok(exit_code::CONFIGURATION);
            }
        };

        let threshold = config.deidentification.score_threshold;
        let spans = deidentifier.engine().analyze(&self.text, threshold)?;
        let result = deidentifier.engine().redact(&self.text, threshold)?;

        let mut text = result.text;
        let mut ner_replacements = 0;
        if self.use_transformers {
            match deidentifier.scrubber().scrub(&text).await {
                Ok(outcome) => {
                    text = outcome.text;
                    ner_replacements = outcome.replaced;
                }
                Err(e) => {
                    eprintln!("❌ Entity recognition failed: {e}");
                    return Ok(exit_code::FATAL);
                }
            }
        }

        println!("{text}");
        println!();
        if spans.is_empty() && ner_replacements == 0 {
            println!("✅ No PHI detected");
            return Ok(exit_code::SUCCESS);
        }

        println!("🔍 Detections:");
        for span in &spans {
            println!(
                "  [{}..{}] {} ({}, {:.2})",
                span.start, span.end, span.category, span.detector, span.confidence
            );
        }
        if ner_replacements > 0 {
            println!("  NER replacements: {ner_replacements}");
        }

        Ok(exit_code::SUCCESS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_scan_without_config_file() {
        let dir = tempdir().unwrap();
        let args = ScanArgs {
            text: "Referred by Dr John Doe on 12/03/2021".to_string(),
            score_threshold: None,
            use_transformers: false,
        };
        let code = args
            .execute(dir.path().join("missing.toml").to_str().unwrap())
            .await
            .unwrap();
        assert_eq!(code, exit_code::SUCCESS);
    }

    #[tokio::test]
    async fn test_scan_rejects_bad_threshold() {
        let dir = tempdir().unwrap();
        let args = ScanArgs {
            text: "axial t2 flair".to_string(),
            score_threshold: Some(-1.0),
            use_transformers: false,
        };
        let code = args
            .execute(dir.path().join("missing.toml").to_str().unwrap())
            .await
            .unwrap();
        assert_eq!(code, exit_code::CONFIGURATION);
    }
}

//! Deidentify command implementation
//!
//! This module implements the `deidentify` command, which runs the derivative
//! orchestrator over one session of the filesystem record store.

use super::load_config_or_default;
use crate::adapters::codec::JsonImageCodec;
use crate::adapters::filesystem::FileSystemRecordStore;
use crate::cli::exit_code;
use crate::core::derivative::{DeidentificationSummary, DerivativeOrchestrator};
use crate::deidentification::{Deidentifier, DeidentifyOptions};
use crate::domain::{PhiScrubError, SessionId};
use clap::Args;
use std::sync::Arc;

/// Arguments for the deidentify command
#[derive(Args, Debug)]
pub struct DeidentifyArgs {
    /// Session to process
    #[arg(long)]
    pub session: String,

    /// Dry run mode - process every record but write nothing
    #[arg(long)]
    pub dry_run: bool,

    /// Keep the original pixel data
    #[arg(long)]
    pub no_destroy_pixels: bool,

    /// Run the configured NER recognizers over free text
    #[arg(long)]
    pub use_transformers: bool,

    /// Override the detector score threshold (0.0 - 1.0)
    #[arg(long, value_name = "SCORE")]
    pub score_threshold: Option<f32>,
}

impl DeidentifyArgs {
    /// Execute the deidentify command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(session = %self.session, "Starting deidentify command");

        let mut config = match load_config_or_default(config_path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("❌ Failed to load configuration: {e}");
                return Ok(exit_code::CONFIGURATION);
            }
        };

        // Apply CLI overrides
        if self.dry_run {
            tracing::info!("Enabling dry-run mode from CLI");
            config.application.dry_run = true;
        }
        if self.no_destroy_pixels {
            config.deidentification.destroy_pixels = false;
        }
        if self.use_transformers {
            config.deidentification.use_transformers = true;
        }
        if let Some(threshold) = self.score_threshold {
            tracing::info!(threshold, "Overriding score threshold from CLI");
            config.deidentification.score_threshold = threshold;
        }

        if let Err(e) = config.validate() {
            tracing::error!(error = %e, "Configuration validation failed");
            eprintln!("❌ Configuration validation failed: {e}");
            return Ok(exit_code::CONFIGURATION);
        }

        let session = match SessionId::new(self.session.as_str()) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("❌ Invalid session id: {e}");
                return Ok(exit_code::CONFIGURATION);
            }
        };

        let deidentifier = match Deidentifier::new(
            &config.deidentification,
            &config.ner,
            &config.audit,
        ) {
            Ok(d) => d,
            Err(e) => {
                tracing::error!(error = %e, "Failed to build de-identification pipeline");
                eprintln!("❌ Failed to initialize pipeline: {e:#}");
                return Ok(exit_code::CONFIGURATION);
            }
        };

        let options =
            DeidentifyOptions::from_config(&config.deidentification, config.application.dry_run);

        if options.use_transformers && !deidentifier.scrubber().is_enabled() {
            tracing::warn!("use_transformers is set but no recognizers are configured");
        }

        if options.dry_run {
            println!("🔍 DRY RUN MODE - No derivatives will be written");
            println!();
        }

        let orchestrator = DerivativeOrchestrator::new(
            Arc::new(FileSystemRecordStore::new(&config.store.root)),
            Arc::new(JsonImageCodec::new()),
            Arc::new(deidentifier),
        );

        println!("🚀 De-identifying session {session}...");
        println!();

        let summary = match orchestrator.deidentify(&session, &options).await {
            Ok(s) => s,
            Err(PhiScrubError::SessionNotFound(name)) => {
                tracing::error!(session = %name, "Session not found");
                eprintln!("❌ Session not found: {name}");
                return Ok(exit_code::SESSION_NOT_FOUND);
            }
            Err(e) => {
                tracing::error!(error = %e, "De-identification failed");
                eprintln!("❌ De-identification failed: {e}");
                return Ok(exit_code::FATAL);
            }
        };

        summary.log_summary();
        print_summary(&summary);

        let code = if summary.is_successful() {
            println!("✅ De-identification completed successfully!");
            exit_code::SUCCESS
        } else {
            println!("⚠️  De-identification completed with errors");
            exit_code::COMPLETED_WITH_ERRORS
        };

        Ok(code)
    }
}

fn print_summary(summary: &DeidentificationSummary) {
    println!("📊 De-identification Summary:");
    println!("  Run ID: {}", summary.run_id);
    println!("  Entries Seen: {}", summary.entries_seen);
    println!("  Entries Processed: {}", summary.entries_processed);
    println!("  Entries Skipped: {}", summary.entries_skipped);
    println!("  Entries Failed: {}", summary.entries_failed);
    println!("  Records Processed: {}", summary.records_processed);
    println!("  Records Failed: {}", summary.records_failed);
    println!("  Fields Redacted: {}", summary.fields_redacted);
    println!("  Person Names Replaced: {}", summary.person_names_replaced);
    if !summary.detections_by_category.is_empty() {
        println!("  Detections:");
        for (category, count) in &summary.detections_by_category {
            println!("    {category}: {count}");
        }
    }
    if summary.dry_run {
        println!("  Derivatives: none written (dry run)");
    } else {
        println!("  Derivatives Created: {}", summary.derivatives_created.len());
        for name in &summary.derivatives_created {
            println!("    - {name}");
        }
    }
    println!("  Duration: {:.2}s", summary.duration.as_secs_f64());
    println!();

    if !summary.errors.is_empty() {
        println!("⚠️  Errors encountered:");
        for error in &summary.errors {
            println!("  - {:?}: {}", error.error_type, error.message);
            if let Some(context) = &error.context {
                println!("    Context: {context}");
            }
        }
        println!();
    }
}

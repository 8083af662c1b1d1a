//! Count command implementation
//!
//! This module implements the `count` command, a record inventory over the
//! filesystem record store.

use super::load_config_or_default;
use crate::adapters::filesystem::FileSystemRecordStore;
use crate::cli::exit_code;
use crate::core::derivative::count_records;
use crate::domain::{PhiScrubError, SessionId};
use clap::Args;

/// Arguments for the count command
#[derive(Args, Debug)]
pub struct CountArgs {
    /// Session to inspect
    #[arg(long)]
    pub session: String,

    /// Count a single entry instead of every DICOM series
    #[arg(long)]
    pub entry: Option<String>,
}

impl CountArgs {
    /// Execute the count command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let config = match load_config_or_default(config_path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("❌ Failed to load configuration: {e}");
                return Ok(exit_code::CONFIGURATION);
            }
        };

        let session = match SessionId::new(self.session.as_str()) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("❌ Invalid session id: {e}");
                return Ok(exit_code::CONFIGURATION);
            }
        };

        let store = FileSystemRecordStore::new(&config.store.root);
        match count_records(&store, &session, self.entry.as_deref()).await {
            Ok(count) => {
                match &self.entry {
                    Some(entry) => println!("📦 {session}/{entry}: {count} record(s)"),
                    None => println!("📦 {session}: {count} record(s)"),
                }
                Ok(exit_code::SUCCESS)
            }
            Err(PhiScrubError::SessionNotFound(name)) => {
                eprintln!("❌ Session not found: {name}");
                Ok(exit_code::SESSION_NOT_FOUND)
            }
            Err(e) => {
                tracing::error!(session = %session, error = %e, "Count failed");
                eprintln!("❌ Count failed: {e}");
                Ok(exit_code::FATAL)
            }
        }
    }
}

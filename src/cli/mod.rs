//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for phiscrub using clap.

pub mod commands;

use clap::{Parser, Subcommand};

/// phiscrub - DICOM metadata de-identification
#[derive(Parser, Debug)]
#[command(name = "phiscrub")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "phiscrub.toml", env = "PHISCRUB_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "PHISCRUB_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create de-identified derivatives for every eligible series of a session
    Deidentify(commands::deidentify::DeidentifyArgs),

    /// Count records in a session or one of its entries
    Count(commands::count::CountArgs),

    /// Preview redaction of a piece of text
    Scan(commands::scan::ScanArgs),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),
}

/// Process exit codes
pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    /// Completed, but some entries or records failed
    pub const COMPLETED_WITH_ERRORS: i32 = 1;
    pub const CONFIGURATION: i32 = 2;
    pub const SESSION_NOT_FOUND: i32 = 3;
    pub const FATAL: i32 = 5;
}

// phiscrub - DICOM metadata de-identification
// Copyright (c) 2025 phiscrub Contributors
// Licensed under the MIT License

//! # phiscrub - DICOM metadata de-identification
//!
//! phiscrub removes protected health information from DICOM image series held
//! in a research data store, writing de-identified copies next to the
//! originals.
//!
//! ## Overview
//!
//! This library provides the core functionality for:
//! - **Detecting** PHI in free text with a registry of pattern and deny-list detectors
//! - **Redacting** detected spans with a fixed placeholder after merging overlaps
//! - **Scrubbing** remaining names, places and organisations with pluggable NER recognizers
//! - **Dispatching** each metadata field by value representation
//! - **Destroying** pixel data
//! - **Orchestrating** idempotent derivative creation per session
//!
//! ## Architecture
//!
//! phiscrub follows a layered architecture:
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Session orchestration, summaries and inventory
//! - [`deidentification`] - Detectors, redaction engine, NER, field dispatch, pixels, audit
//! - [`adapters`] - Record stores and image codecs
//! - [`domain`] - Core domain types and models
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use phiscrub::adapters::codec::JsonImageCodec;
//! use phiscrub::adapters::filesystem::FileSystemRecordStore;
//! use phiscrub::config::load_config;
//! use phiscrub::core::derivative::DerivativeOrchestrator;
//! use phiscrub::deidentification::{Deidentifier, DeidentifyOptions};
//! use phiscrub::domain::SessionId;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config("phiscrub.toml")?;
//!
//!     let deidentifier = Deidentifier::new(&config.deidentification, &config.ner, &config.audit)?;
//!     let orchestrator = DerivativeOrchestrator::new(
//!         Arc::new(FileSystemRecordStore::new(&config.store.root)),
//!         Arc::new(JsonImageCodec::new()),
//!         Arc::new(deidentifier),
//!     );
//!
//!     let options = DeidentifyOptions::from_config(&config.deidentification, false);
//!     let summary = orchestrator
//!         .deidentify(&SessionId::new("MR-0042")?, &options)
//!         .await?;
//!
//!     println!("Created {} derivatives", summary.derivatives_created.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Redacting Text
//!
//! ```rust
//! use phiscrub::deidentification::RedactionEngine;
//!
//! # fn example() -> anyhow::Result<()> {
//! let engine = RedactionEngine::with_defaults()?;
//! let result = engine.redact("Patient: Female, DOB 01/01/1980", 0.5)?;
//! assert!(!result.text.contains("1980"));
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Library operations return [`domain::Result`], backed by [`domain::PhiScrubError`].
//! Construction and configuration paths use `anyhow` with context.

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod deidentification;
pub mod domain;
pub mod logging;

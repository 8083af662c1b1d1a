//! Core business logic for phiscrub.
//!
//! This module contains the session-level orchestration on top of the
//! record-level pipeline in [`crate::deidentification`].
//!
//! # Modules
//!
//! - [`derivative`] - Derivative orchestration, summaries and record inventory
//!
//! # Workflow
//!
//! 1. **Snapshot**: List the session's entries once
//! 2. **Filter**: Keep DICOM series that are neither derivatives nor already de-identified
//! 3. **Transform**: Decode each file, redact its metadata, destroy pixels, re-encode
//! 4. **Store**: Create the `@deidentified` entry linked to its source and write the files
//! 5. **Report**: Produce a [`derivative::DeidentificationSummary`]
//!
//! # Example
//!
//! ```rust,no_run
//! use phiscrub::adapters::codec::JsonImageCodec;
//! use phiscrub::adapters::filesystem::FileSystemRecordStore;
//! use phiscrub::core::derivative::DerivativeOrchestrator;
//! use phiscrub::deidentification::{Deidentifier, DeidentifyOptions};
//! use phiscrub::domain::SessionId;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let orchestrator = DerivativeOrchestrator::new(
//!     Arc::new(FileSystemRecordStore::new("./data/sessions")),
//!     Arc::new(JsonImageCodec::new()),
//!     Arc::new(Deidentifier::with_defaults()?),
//! );
//!
//! let session = SessionId::new("MR-0042")?;
//! let summary = orchestrator
//!     .deidentify(&session, &DeidentifyOptions::default())
//!     .await?;
//!
//! println!("Derivatives: {}", summary.derivatives_created.len());
//! println!("Records: {}", summary.records_processed);
//! # Ok(())
//! # }
//! ```

pub mod derivative;

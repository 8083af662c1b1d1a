//! De-identification pipeline
//!
//! Removes protected health information from decoded image records.
//!
//! # Architecture
//!
//! - **Detection**: deny-list and regex detectors in a [`DetectorRegistry`]
//! - **Redaction**: [`RedactionEngine`] merges overlapping spans and writes the placeholder
//! - **NER**: optional [`NerScrubber`] pass over free text
//! - **Dispatch**: [`FieldDispatcher`] routes each field by VR category
//! - **Pixels**: [`destroy_pixels`] swaps image data for an 8x8 zero buffer
//! - **Audit**: JSON lines with hashed original values
//!
//! [`Deidentifier`] ties these together for one record at a time.

pub mod audit;
pub mod config;
pub mod detector;
pub mod dispatch;
pub mod engine;
pub mod models;
pub mod ner;
pub mod pipeline;
pub mod pixels;

// Re-export main types
pub use config::{AuditConfig, DeidentificationConfig, NerConfig, RecognizerConfig};
pub use detector::{DetectorRegistry, PatternRegistry, PhiDetector};
pub use dispatch::{FieldDispatcher, FieldOutcome, FieldSkipReason};
pub use engine::RedactionEngine;
pub use models::{DetectionSpan, PhiCategory, RedactionResult};
pub use ner::{EntityRecognizer, NerFailurePolicy, NerScrubber};
pub use pipeline::{Deidentifier, DeidentifyOptions, RecordReport};
pub use pixels::destroy_pixels;

//! Record-level de-identification pipeline
//!
//! [`Deidentifier`] is the long-lived handle holding the compiled detector
//! registry, the redaction engine, the NER scrubber and the optional audit
//! logger. It is built once per process and shared by reference.
//!
//! # Examples
//!
//! ```
//! use phiscrub::deidentification::{Deidentifier, DeidentifyOptions};
//! use phiscrub::domain::{DicomTag, FieldValue, ImageRecord, MetadataField, Vr};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let deidentifier = Deidentifier::with_defaults()?;
//!
//! let record = ImageRecord::new("1.2.3").with_field(MetadataField::new(
//!     DicomTag::PATIENT_NAME,
//!     Vr::PN,
//!     FieldValue::Text("Doe^John".into()),
//! ));
//!
//! let (record, report) = deidentifier
//!     .process_record(record, &DeidentifyOptions::default())
//!     .await?;
//! assert_eq!(record.text(DicomTag::PATIENT_NAME), Some("XXXX"));
//! assert_eq!(report.person_names_replaced, 1);
//! # Ok(())
//! # }
//! ```

use crate::config::secret_string_opt;
use crate::deidentification::audit::{AuditLogger, FieldAudit};
use crate::deidentification::config::{
    AuditConfig, DeidentificationConfig, NerConfig, RecognizerConfig,
};
use crate::deidentification::detector::{DetectorRegistry, PatternRegistry};
use crate::deidentification::dispatch::{FieldDispatcher, FieldOutcome, PERSON_NAME_PLACEHOLDER};
use crate::deidentification::engine::RedactionEngine;
use crate::deidentification::models::PhiCategory;
use crate::deidentification::ner::{
    EntityRecognizer, GazetteerRecognizer, HttpEntityRecognizer, NerFailurePolicy, NerScrubber,
};
use crate::deidentification::pixels::destroy_pixels;
use crate::domain::{ImageRecord, Result};
use anyhow::Context;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// Per-run switches
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeidentifyOptions {
    pub score_threshold: f32,
    pub use_transformers: bool,
    pub destroy_pixels: bool,
    /// Do all the work but write nothing back
    pub dry_run: bool,
}

impl Default for DeidentifyOptions {
    fn default() -> Self {
        Self {
            score_threshold: 0.5,
            use_transformers: false,
            destroy_pixels: true,
            dry_run: false,
        }
    }
}

impl DeidentifyOptions {
    pub fn from_config(config: &DeidentificationConfig, dry_run: bool) -> Self {
        Self {
            score_threshold: config.score_threshold,
            use_transformers: config.use_transformers,
            destroy_pixels: config.destroy_pixels,
            dry_run,
        }
    }
}

/// What happened to one record
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordReport {
    pub record_id: String,
    /// Modified fields, with hashed originals
    pub changes: Vec<FieldAudit>,
    pub fields_redacted: usize,
    pub person_names_replaced: usize,
    pub ner_replacements: usize,
    pub fields_skipped: usize,
    /// Text values in which each category was detected
    pub categories: BTreeMap<PhiCategory, usize>,
    pub pixels_destroyed: bool,
}

impl RecordReport {
    fn new(record_id: &str) -> Self {
        Self {
            record_id: record_id.to_string(),
            ..Default::default()
        }
    }
}

/// Long-lived de-identification handle
pub struct Deidentifier {
    engine: RedactionEngine,
    scrubber: NerScrubber,
    person_name_placeholder: String,
    audit: Option<AuditLogger>,
}

impl Deidentifier {
    /// Build the pipeline from configuration
    ///
    /// Compiles the pattern library (built-in or `pattern_library`), adds the
    /// deny-list files, and instantiates the configured recognizers.
    pub fn new(
        config: &DeidentificationConfig,
        ner: &NerConfig,
        audit: &AuditConfig,
    ) -> anyhow::Result<Self> {
        config
            .validate()
            .context("Invalid de-identification configuration")?;
        ner.validate().context("Invalid NER configuration")?;
        audit.validate().context("Invalid audit configuration")?;

        let mut patterns = match config.pattern_library {
            Some(ref path) => PatternRegistry::from_file(path)?,
            None => PatternRegistry::default_patterns()?,
        };
        for deny_list in &config.deny_lists {
            patterns.add_deny_list_file(&deny_list.name, &deny_list.category, &deny_list.path)?;
        }
        let registry = patterns.into_detector_registry()?;

        tracing::info!(
            detectors = registry.len(),
            recognizers = ner.recognizers.len(),
            "De-identification pipeline initialized"
        );

        let engine = RedactionEngine::new(Arc::new(registry))
            .with_placeholder(config.placeholder.clone());

        let mut scrubber =
            NerScrubber::new(ner.failure_policy).with_placeholder(config.placeholder.clone());
        for recognizer in &ner.recognizers {
            scrubber.add_recognizer(build_recognizer(recognizer)?);
        }

        let audit = if audit.enabled {
            Some(AuditLogger::new(audit.log_path.clone(), audit.json_format)?)
        } else {
            None
        };

        Ok(Self {
            engine,
            scrubber,
            person_name_placeholder: config.person_name_placeholder.clone(),
            audit,
        })
    }

    /// Built-in patterns, no recognizers, no audit
    pub fn with_defaults() -> anyhow::Result<Self> {
        Ok(Self::from_parts(
            RedactionEngine::new(Arc::new(DetectorRegistry::with_defaults()?)),
            NerScrubber::new(NerFailurePolicy::default()),
        ))
    }

    pub fn from_parts(engine: RedactionEngine, scrubber: NerScrubber) -> Self {
        Self {
            engine,
            scrubber,
            person_name_placeholder: PERSON_NAME_PLACEHOLDER.to_string(),
            audit: None,
        }
    }

    pub fn with_audit(mut self, audit: AuditLogger) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn engine(&self) -> &RedactionEngine {
        &self.engine
    }

    pub fn scrubber(&self) -> &NerScrubber {
        &self.scrubber
    }

    pub fn audit(&self) -> Option<&AuditLogger> {
        self.audit.as_ref()
    }

    /// De-identify one decoded record
    ///
    /// Fields are dispatched in tag order. Field-level problems are absorbed
    /// into the report; only a fatal NER error is returned.
    pub async fn process_record(
        &self,
        mut record: ImageRecord,
        options: &DeidentifyOptions,
    ) -> Result<(ImageRecord, RecordReport)> {
        let mut report = RecordReport::new(&record.id);

        let mut dispatcher = FieldDispatcher::new(&self.engine, options.score_threshold)
            .with_person_name_placeholder(&self.person_name_placeholder);
        if options.use_transformers {
            dispatcher = dispatcher.with_scrubber(&self.scrubber);
        }

        for field in record.fields.values_mut() {
            let original = field.value.clone();
            let outcome = dispatcher.dispatch(field).await?;

            match &outcome {
                FieldOutcome::Replaced => report.person_names_replaced += 1,
                FieldOutcome::Redacted {
                    ner_replacements,
                    categories,
                    ..
                } => {
                    report.fields_redacted += 1;
                    report.ner_replacements += ner_replacements;
                    for category in categories {
                        *report.categories.entry(*category).or_insert(0) += 1;
                    }
                }
                FieldOutcome::Skipped { .. } => report.fields_skipped += 1,
                FieldOutcome::Unchanged => {}
            }

            if let Some(change) = FieldAudit::from_outcome(field, &original, &outcome) {
                report.changes.push(change);
            }
        }

        if options.destroy_pixels && record.pixel_data.is_some() {
            record = destroy_pixels(record);
            report.pixels_destroyed = true;
        }

        tracing::debug!(
            record = %report.record_id,
            fields_redacted = report.fields_redacted,
            person_names = report.person_names_replaced,
            fields_skipped = report.fields_skipped,
            pixels_destroyed = report.pixels_destroyed,
            "Record de-identified"
        );

        Ok((record, report))
    }
}

/// Token used by HTTP recognizers that carry none in their config
pub const NER_TOKEN_ENV: &str = "PHISCRUB_NER_API_TOKEN";

fn build_recognizer(config: &RecognizerConfig) -> anyhow::Result<Arc<dyn EntityRecognizer>> {
    let recognizer: Arc<dyn EntityRecognizer> = match config {
        RecognizerConfig::Http {
            name,
            endpoint,
            api_token,
            timeout_seconds,
        } => Arc::new(HttpEntityRecognizer::new(
            name.clone(),
            endpoint.clone(),
            api_token
                .clone()
                .or_else(|| secret_string_opt(std::env::var(NER_TOKEN_ENV).ok())),
            Duration::from_secs(*timeout_seconds),
        )?),
        RecognizerConfig::Gazetteer {
            name,
            path,
            entity_group,
        } => Arc::new(
            GazetteerRecognizer::from_file(name.clone(), entity_group.clone(), path)
                .with_context(|| format!("Failed to load gazetteer: {}", path.display()))?,
        ),
    };
    Ok(recognizer)
}

impl std::fmt::Debug for Deidentifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Deidentifier")
            .field("engine", &self.engine)
            .field("scrubber", &self.scrubber)
            .field("audit", &self.audit.as_ref().map(|a| a.log_path().to_path_buf()))
            .finish()
    }
}

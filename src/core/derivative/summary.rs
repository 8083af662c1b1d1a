//! De-identification summary and reporting
//!
//! This module defines structures for tracking and reporting the results of
//! a `deidentify` run.

use crate::deidentification::models::PhiCategory;
use crate::deidentification::RecordReport;
use crate::domain::RunId;
use std::collections::BTreeMap;
use std::time::Duration;

/// Summary of a de-identification run
#[derive(Debug, Clone)]
pub struct DeidentificationSummary {
    /// Identifier shared with every audit line of the run
    pub run_id: RunId,

    /// Whether the run wrote nothing back
    pub dry_run: bool,

    /// Entries listed in the session snapshot
    pub entries_seen: usize,

    /// Entries for which a derivative was produced (or would be, in a dry run)
    pub entries_processed: usize,

    /// Entries skipped as ineligible
    pub entries_skipped: usize,

    /// Entries that could not be read or transformed
    pub entries_failed: usize,

    /// Records transformed successfully
    pub records_processed: usize,

    /// Records that failed to decode, process or encode
    pub records_failed: usize,

    /// Text fields with at least one redaction
    pub fields_redacted: usize,

    /// Person-name fields replaced outright
    pub person_names_replaced: usize,

    /// Fields left untouched after a detector failure or bad encoding
    pub fields_skipped: usize,

    /// Text values in which each category was detected
    pub detections_by_category: BTreeMap<PhiCategory, usize>,

    /// Names of the derivative entries created
    pub derivatives_created: Vec<String>,

    /// Duration of the run
    pub duration: Duration,

    /// Errors encountered during the run
    pub errors: Vec<DeidError>,
}

impl DeidentificationSummary {
    /// Create a new empty summary
    pub fn new(run_id: RunId, dry_run: bool) -> Self {
        Self {
            run_id,
            dry_run,
            entries_seen: 0,
            entries_processed: 0,
            entries_skipped: 0,
            entries_failed: 0,
            records_processed: 0,
            records_failed: 0,
            fields_redacted: 0,
            person_names_replaced: 0,
            fields_skipped: 0,
            detections_by_category: BTreeMap::new(),
            derivatives_created: Vec::new(),
            duration: Duration::from_secs(0),
            errors: Vec::new(),
        }
    }

    /// Set the duration
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Add an error
    pub fn add_error(&mut self, error: DeidError) {
        self.errors.push(error);
    }

    /// Fold a record report into the totals
    pub fn record(&mut self, report: &RecordReport) {
        self.records_processed += 1;
        self.fields_redacted += report.fields_redacted;
        self.person_names_replaced += report.person_names_replaced;
        self.fields_skipped += report.fields_skipped;
        for (category, count) in &report.categories {
            *self.detections_by_category.entry(*category).or_insert(0) += count;
        }
    }

    /// Total detections over all categories
    pub fn total_detections(&self) -> usize {
        self.detections_by_category.values().sum()
    }

    /// Check if the run was successful (no failures)
    pub fn is_successful(&self) -> bool {
        self.entries_failed == 0 && self.records_failed == 0 && self.errors.is_empty()
    }

    /// Log the summary
    pub fn log_summary(&self) {
        let categories = self
            .detections_by_category
            .iter()
            .map(|(category, count)| format!("{category}={count}"))
            .collect::<Vec<_>>()
            .join(",");

        tracing::info!(
            run_id = %self.run_id,
            dry_run = self.dry_run,
            entries_seen = self.entries_seen,
            entries_processed = self.entries_processed,
            entries_skipped = self.entries_skipped,
            entries_failed = self.entries_failed,
            records_processed = self.records_processed,
            records_failed = self.records_failed,
            fields_redacted = self.fields_redacted,
            person_names_replaced = self.person_names_replaced,
            detections = %categories,
            derivatives_created = self.derivatives_created.len(),
            duration_secs = self.duration.as_secs(),
            "De-identification completed"
        );

        if !self.errors.is_empty() {
            tracing::warn!(
                error_count = self.errors.len(),
                "De-identification completed with errors"
            );
            for error in &self.errors {
                tracing::warn!(
                    error_type = ?error.error_type,
                    message = %error.message,
                    context = error.context.as_deref().unwrap_or(""),
                    "De-identification error"
                );
            }
        }
    }
}

/// Type of de-identification error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeidErrorType {
    /// Reading a series from the store
    Read,
    /// Decoding a stored file
    Decode,
    /// Processing a decoded record
    Process,
    /// Encoding a transformed record
    Encode,
    /// Creating or writing the derivative entry
    Write,
    /// Writing the audit trail
    Audit,
}

/// De-identification error with context
#[derive(Debug, Clone)]
pub struct DeidError {
    /// Type of error
    pub error_type: DeidErrorType,

    /// Error message
    pub message: String,

    /// Optional context (entry name, file name)
    pub context: Option<String>,
}

impl DeidError {
    /// Create a new error
    pub fn new(error_type: DeidErrorType, message: impl Into<String>) -> Self {
        Self {
            error_type,
            message: message.into(),
            context: None,
        }
    }

    /// Add context to the error
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_creation() {
        let summary = DeidentificationSummary::new(RunId::generate(), true);

        assert!(summary.dry_run);
        assert_eq!(summary.entries_seen, 0);
        assert_eq!(summary.records_processed, 0);
        assert_eq!(summary.total_detections(), 0);
        assert!(summary.derivatives_created.is_empty());
        assert!(summary.is_successful());
    }

    #[test]
    fn test_summary_with_duration() {
        let summary = DeidentificationSummary::new(RunId::generate(), false)
            .with_duration(Duration::from_secs(42));
        assert_eq!(summary.duration, Duration::from_secs(42));
    }

    #[test]
    fn test_record_folds_report() {
        let mut summary = DeidentificationSummary::new(RunId::generate(), false);
        let mut report = RecordReport {
            fields_redacted: 2,
            person_names_replaced: 1,
            ..Default::default()
        };
        report.categories.insert(PhiCategory::Date, 2);
        report.categories.insert(PhiCategory::Person, 1);

        summary.record(&report);
        summary.record(&report);

        assert_eq!(summary.records_processed, 2);
        assert_eq!(summary.fields_redacted, 4);
        assert_eq!(summary.person_names_replaced, 2);
        assert_eq!(summary.detections_by_category[&PhiCategory::Date], 4);
        assert_eq!(summary.total_detections(), 6);
    }

    #[test]
    fn test_errors_make_run_unsuccessful() {
        let mut summary = DeidentificationSummary::new(RunId::generate(), false);
        summary.add_error(
            DeidError::new(DeidErrorType::Decode, "bad preamble").with_context("CT/DICOM/1.dcm"),
        );

        assert!(!summary.is_successful());
        assert_eq!(summary.errors[0].context.as_deref(), Some("CT/DICOM/1.dcm"));
    }
}

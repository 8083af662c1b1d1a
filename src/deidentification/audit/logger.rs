//! Audit logger for de-identification runs

use crate::deidentification::dispatch::FieldOutcome;
use crate::domain::{FieldValue, MetadataField, RunId};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Audit entry for a single changed field
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldAudit {
    /// `GGGGEEEE`
    pub tag: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyword: Option<String>,
    pub vr: String,
    /// `replaced` or `redacted`
    pub action: String,
    pub categories: Vec<String>,
    /// SHA-256 hash of the original value (never log plaintext PHI)
    pub original_hash: String,
}

impl FieldAudit {
    /// Build the entry for a field that was modified
    ///
    /// Returns `None` for outcomes that left the value untouched.
    pub fn from_outcome(
        field: &MetadataField,
        original: &FieldValue,
        outcome: &FieldOutcome,
    ) -> Option<Self> {
        let (action, categories) = match outcome {
            FieldOutcome::Replaced => ("replaced", vec!["PERSON".to_string()]),
            FieldOutcome::Redacted { categories, .. } => (
                "redacted",
                categories.iter().map(|c| c.label().to_string()).collect(),
            ),
            FieldOutcome::Unchanged | FieldOutcome::Skipped { .. } => return None,
        };

        Some(Self {
            tag: String::from(field.tag),
            keyword: field.keyword.clone(),
            vr: field.vr.to_string(),
            action: action.to_string(),
            categories,
            original_hash: hash_value(&original.digest_input()),
        })
    }
}

/// Audit entry for one transformed record
#[derive(Debug, Clone, Serialize)]
pub struct RecordAudit {
    pub timestamp: DateTime<Utc>,
    pub run_id: String,
    pub session: String,
    pub entry: String,
    pub record_id: String,
    pub output_name: String,
    pub dry_run: bool,
    pub pixels_destroyed: bool,
    pub fields: Vec<FieldAudit>,
}

/// Hash a value using SHA-256, lower-case hex
pub fn hash_value(value: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(value);
    let result = hasher.finalize();
    format!("{result:x}")
}

/// Append-only audit log
pub struct AuditLogger {
    log_path: PathBuf,
    json_format: bool,
    write_lock: Mutex<()>,
}

impl AuditLogger {
    /// Create a new audit logger, creating the parent directory if needed
    pub fn new(log_path: PathBuf, json_format: bool) -> Result<Self> {
        if let Some(parent) = log_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create audit log directory: {}", parent.display())
                })?;
            }
        }

        Ok(Self {
            log_path,
            json_format,
            write_lock: Mutex::new(()),
        })
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// Append one record entry
    pub fn log_record(&self, entry: &RecordAudit) -> Result<()> {
        let line = if self.json_format {
            serde_json::to_string(entry).context("Failed to serialize audit entry")?
        } else {
            format!(
                "[{}] Run: {} | Session: {} | Entry: {} | Record: {} -> {} | Fields: {} | Pixels destroyed: {}",
                entry.timestamp.to_rfc3339(),
                entry.run_id,
                entry.session,
                entry.entry,
                entry.record_id,
                entry.output_name,
                entry.fields.len(),
                entry.pixels_destroyed
            )
        };

        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| anyhow::anyhow!("Audit log lock poisoned"))?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)
            .with_context(|| format!("Failed to open audit log: {}", self.log_path.display()))?;
        writeln!(file, "{line}").context("Failed to write audit entry")?;

        Ok(())
    }
}

impl RecordAudit {
    pub fn new(
        run_id: RunId,
        session: impl Into<String>,
        entry: impl Into<String>,
        record_id: impl Into<String>,
        output_name: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            run_id: run_id.to_string(),
            session: session.into(),
            entry: entry.into(),
            record_id: record_id.into(),
            output_name: output_name.into(),
            dry_run: false,
            pixels_destroyed: false,
            fields: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deidentification::models::PhiCategory;
    use crate::domain::{DicomTag, Vr};
    use std::collections::BTreeSet;
    use tempfile::tempdir;

    fn patient_name() -> MetadataField {
        MetadataField::new(
            DicomTag::PATIENT_NAME,
            Vr::PN,
            FieldValue::Text("Doe^John".into()),
        )
        .with_keyword("PatientName")
    }

    #[test]
    fn test_hash_value() {
        let hash1 = hash_value(b"Doe^John");
        let hash2 = hash_value(b"Doe^John");
        let hash3 = hash_value(b"Roe^Jane");

        assert_eq!(hash1, hash2);
        assert_ne!(hash1, hash3);
        assert_eq!(hash1.len(), 64);
    }

    #[test]
    fn test_field_audit_skips_unmodified() {
        let field = patient_name();
        assert!(FieldAudit::from_outcome(&field, &field.value, &FieldOutcome::Unchanged).is_none());
    }

    #[test]
    fn test_log_record_never_writes_plaintext() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("nested").join("audit.log");
        let logger = AuditLogger::new(log_path.clone(), true).unwrap();

        let field = patient_name();
        let mut entry = RecordAudit::new(RunId::generate(), "ses-01", "scan1/DICOM", "1.2.3", "1_deidentified.dcm");
        entry.fields.push(
            FieldAudit::from_outcome(&field, &field.value, &FieldOutcome::Replaced).unwrap(),
        );
        let desc = MetadataField::new(
            DicomTag::STUDY_DESCRIPTION,
            Vr::LO,
            FieldValue::Text("Dr Smith".into()),
        );
        let redacted = FieldOutcome::Redacted {
            spans: 1,
            ner_replacements: 0,
            categories: BTreeSet::from([PhiCategory::Title, PhiCategory::Person]),
        };
        entry
            .fields
            .push(FieldAudit::from_outcome(&desc, &desc.value, &redacted).unwrap());

        logger.log_record(&entry).unwrap();
        logger.log_record(&entry).unwrap();

        let content = std::fs::read_to_string(&log_path).unwrap();
        assert_eq!(content.lines().count(), 2);
        assert!(content.contains("scan1/DICOM"));
        assert!(content.contains("00100010"));
        assert!(content.contains("TITLE"));
        assert!(!content.contains("Doe^John"));
        assert!(!content.contains("Dr Smith"));

        let line: serde_json::Value =
            serde_json::from_str(content.lines().next().unwrap()).unwrap();
        assert_eq!(line["fields"][0]["action"], "replaced");
        assert_eq!(line["fields"][0]["original_hash"], hash_value(b"Doe^John"));
    }

    #[test]
    fn test_plain_text_format() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("audit.log");
        let logger = AuditLogger::new(log_path.clone(), false).unwrap();

        let entry = RecordAudit::new(RunId::generate(), "ses-01", "scan1/DICOM", "1.2.3", "1_deidentified.dcm");
        logger.log_record(&entry).unwrap();

        let content = std::fs::read_to_string(&log_path).unwrap();
        assert!(content.contains("Record: 1.2.3 -> 1_deidentified.dcm"));
    }
}

//! VR-driven routing of metadata fields
//!
//! Each field goes down exactly one route, chosen by the category of its
//! value representation:
//!
//! | Category | Route |
//! |---|---|
//! | `PersonName` | value replaced by the person-name placeholder |
//! | `ShortText`, `LongText` | pattern redaction, then NER scrubbing |
//! | `BinaryText` | UTF-8 decode, redaction and scrubbing, re-encode |
//! | `Other` | untouched |

use crate::deidentification::engine::RedactionEngine;
use crate::deidentification::models::PhiCategory;
use crate::deidentification::ner::NerScrubber;
use crate::domain::{FieldCategory, FieldValue, MetadataField, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Value written over person-name fields
pub const PERSON_NAME_PLACEHOLDER: &str = "XXXX";

/// Why a field was left as it was
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldSkipReason {
    /// A detector failed while scanning the value
    DetectorFailure,
    /// Binary text that is not valid UTF-8
    UndecodableText,
}

impl std::fmt::Display for FieldSkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DetectorFailure => write!(f, "detector_failure"),
            Self::UndecodableText => write!(f, "undecodable_text"),
        }
    }
}

/// Result of dispatching one field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldOutcome {
    /// Whole value replaced (person names)
    Replaced,
    /// Some text was redacted or scrubbed
    Redacted {
        /// Merged pattern spans replaced
        spans: usize,
        /// NER occurrences replaced
        ner_replacements: usize,
        categories: BTreeSet<PhiCategory>,
    },
    Unchanged,
    /// Left unmodified because it could not be processed
    Skipped { reason: FieldSkipReason },
}

impl FieldOutcome {
    /// Whether the field value was modified
    pub fn is_modified(&self) -> bool {
        matches!(self, Self::Replaced | Self::Redacted { .. })
    }
}

/// Scrub result for a single string
enum TextOutcome {
    Clean,
    Changed {
        text: String,
        spans: usize,
        ner_replacements: usize,
        categories: BTreeSet<PhiCategory>,
    },
    Failed,
}

/// Routes fields to the redaction engine and NER scrubber
pub struct FieldDispatcher<'a> {
    engine: &'a RedactionEngine,
    scrubber: Option<&'a NerScrubber>,
    score_threshold: f32,
    person_name_placeholder: &'a str,
}

impl<'a> FieldDispatcher<'a> {
    pub fn new(engine: &'a RedactionEngine, score_threshold: f32) -> Self {
        Self {
            engine,
            scrubber: None,
            score_threshold,
            person_name_placeholder: PERSON_NAME_PLACEHOLDER,
        }
    }

    /// Enable the NER pass
    pub fn with_scrubber(mut self, scrubber: &'a NerScrubber) -> Self {
        self.scrubber = Some(scrubber);
        self
    }

    pub fn with_person_name_placeholder(mut self, placeholder: &'a str) -> Self {
        self.person_name_placeholder = placeholder;
        self
    }

    /// Process one field in place
    ///
    /// Only a fatal NER error is returned as `Err`. Detector failures and
    /// undecodable bytes leave the field untouched and report `Skipped`.
    pub async fn dispatch(&self, field: &mut MetadataField) -> Result<FieldOutcome> {
        if field.value.is_empty() {
            return Ok(FieldOutcome::Unchanged);
        }

        match field.vr.category() {
            FieldCategory::PersonName => Ok(self.replace_person_name(field)),
            FieldCategory::ShortText | FieldCategory::LongText => self.scrub_strings(field).await,
            FieldCategory::BinaryText => self.scrub_bytes(field).await,
            FieldCategory::Other => Ok(FieldOutcome::Unchanged),
        }
    }

    fn replace_person_name(&self, field: &mut MetadataField) -> FieldOutcome {
        match field.value {
            FieldValue::Text(_) | FieldValue::Multi(_) => {
                field.value = FieldValue::Text(self.person_name_placeholder.to_string());
                FieldOutcome::Replaced
            }
            _ => FieldOutcome::Unchanged,
        }
    }

    async fn scrub_strings(&self, field: &mut MetadataField) -> Result<FieldOutcome> {
        let values: Vec<String> = match &field.value {
            FieldValue::Text(s) => vec![s.clone()],
            FieldValue::Multi(values) => values.clone(),
            _ => return Ok(FieldOutcome::Unchanged),
        };

        let mut scrubbed = Vec::with_capacity(values.len());
        let mut total_spans = 0;
        let mut total_ner = 0;
        let mut all_categories = BTreeSet::new();

        for value in values {
            match self.scrub_text(&value, field).await? {
                TextOutcome::Clean => scrubbed.push(value),
                TextOutcome::Changed {
                    text,
                    spans,
                    ner_replacements,
                    categories,
                } => {
                    total_spans += spans;
                    total_ner += ner_replacements;
                    all_categories.extend(categories);
                    scrubbed.push(text);
                }
                TextOutcome::Failed => {
                    return Ok(FieldOutcome::Skipped {
                        reason: FieldSkipReason::DetectorFailure,
                    })
                }
            }
        }

        if total_spans == 0 && total_ner == 0 {
            return Ok(FieldOutcome::Unchanged);
        }

        field.value = match field.value {
            FieldValue::Multi(_) => FieldValue::Multi(scrubbed),
            _ => FieldValue::Text(scrubbed.into_iter().next().unwrap_or_default()),
        };

        Ok(FieldOutcome::Redacted {
            spans: total_spans,
            ner_replacements: total_ner,
            categories: all_categories,
        })
    }

    async fn scrub_bytes(&self, field: &mut MetadataField) -> Result<FieldOutcome> {
        if matches!(field.value, FieldValue::Text(_) | FieldValue::Multi(_)) {
            return self.scrub_strings(field).await;
        }
        let bytes = match &field.value {
            FieldValue::Bytes(bytes) => bytes.clone(),
            _ => return Ok(FieldOutcome::Unchanged),
        };

        let decoded = match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(_) => {
                tracing::warn!(
                    field = %field.label(),
                    vr = %field.vr,
                    reason = %FieldSkipReason::UndecodableText,
                    "Skipping field"
                );
                return Ok(FieldOutcome::Skipped {
                    reason: FieldSkipReason::UndecodableText,
                });
            }
        };
        let text = decoded.trim_end_matches(['\0', ' ']);

        match self.scrub_text(text, field).await? {
            TextOutcome::Clean => Ok(FieldOutcome::Unchanged),
            TextOutcome::Changed {
                text,
                spans,
                ner_replacements,
                categories,
            } => {
                field.value = FieldValue::Bytes(text.into_bytes());
                Ok(FieldOutcome::Redacted {
                    spans,
                    ner_replacements,
                    categories,
                })
            }
            TextOutcome::Failed => Ok(FieldOutcome::Skipped {
                reason: FieldSkipReason::DetectorFailure,
            }),
        }
    }

    async fn scrub_text(&self, text: &str, field: &MetadataField) -> Result<TextOutcome> {
        let redaction = match self.engine.redact(text, self.score_threshold) {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(
                    field = %field.label(),
                    vr = %field.vr,
                    reason = %FieldSkipReason::DetectorFailure,
                    error = %e,
                    "Skipping field"
                );
                return Ok(TextOutcome::Failed);
            }
        };

        let (text, ner_replacements) = match self.scrubber {
            Some(scrubber) if scrubber.is_enabled() => {
                let outcome = scrubber.scrub(&redaction.text).await?;
                (outcome.text, outcome.replaced)
            }
            _ => (redaction.text, 0),
        };

        if redaction.redacted_count == 0 && ner_replacements == 0 {
            return Ok(TextOutcome::Clean);
        }

        Ok(TextOutcome::Changed {
            text,
            spans: redaction.redacted_count,
            ner_replacements,
            categories: redaction.categories,
        })
    }
}

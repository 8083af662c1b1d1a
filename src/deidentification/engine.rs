//! Text redaction engine
//!
//! Runs every registered detector over a text value, keeps the spans at or
//! above the score threshold, merges overlapping ranges and replaces each
//! merged range with the placeholder.
//!
//! # Examples
//!
//! ```
//! use phiscrub::deidentification::engine::RedactionEngine;
//!
//! # fn example() -> anyhow::Result<()> {
//! let engine = RedactionEngine::with_defaults()?;
//!
//! let result = engine.redact("Referred by Dr John Doe", 0.5)?;
//! assert!(result.text.contains("[XXXX]"));
//! assert!(!result.text.contains("John Doe"));
//!
//! let clean = engine.redact("Not sensitive", 0.5)?;
//! assert_eq!(clean.text, "Not sensitive");
//! # Ok(())
//! # }
//! ```

use crate::deidentification::detector::DetectorRegistry;
use crate::deidentification::models::{DetectionSpan, PhiCategory, RedactionResult};
use crate::domain::Result;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Placeholder written over redacted spans
pub const DEFAULT_PLACEHOLDER: &str = "[XXXX]";

/// A merged range plus the categories of the spans it absorbed
#[derive(Debug, Clone, PartialEq)]
pub struct MergedSpan {
    pub start: usize,
    pub end: usize,
    pub categories: BTreeSet<PhiCategory>,
}

/// Redaction engine over a shared detector registry
#[derive(Debug, Clone)]
pub struct RedactionEngine {
    registry: Arc<DetectorRegistry>,
    placeholder: String,
}

impl RedactionEngine {
    pub fn new(registry: Arc<DetectorRegistry>) -> Self {
        Self {
            registry,
            placeholder: DEFAULT_PLACEHOLDER.to_string(),
        }
    }

    /// Engine over the built-in pattern library
    pub fn with_defaults() -> anyhow::Result<Self> {
        Ok(Self::new(Arc::new(DetectorRegistry::with_defaults()?)))
    }

    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = placeholder.into();
        self
    }

    pub fn placeholder(&self) -> &str {
        &self.placeholder
    }

    pub fn registry(&self) -> &Arc<DetectorRegistry> {
        &self.registry
    }

    /// Spans at or above `score_threshold`, unmerged
    pub fn analyze(&self, text: &str, score_threshold: f32) -> Result<Vec<DetectionSpan>> {
        let mut spans = self.registry.analyze(text)?;
        spans.retain(|s| s.confidence >= score_threshold && !s.is_empty());
        Ok(spans)
    }

    /// Redact `text`
    ///
    /// Text without any confirmed span is returned unchanged. A detector
    /// failure is returned as an error; callers decide whether to skip the
    /// field or abort.
    pub fn redact(&self, text: &str, score_threshold: f32) -> Result<RedactionResult> {
        if text.is_empty() {
            return Ok(RedactionResult::unchanged(text));
        }

        let spans = self.analyze(text, score_threshold)?;
        if spans.is_empty() {
            return Ok(RedactionResult::unchanged(text));
        }

        let merged = merge_spans(spans);
        let mut categories = BTreeSet::new();
        let mut redacted = text.to_string();

        for span in merged.iter().rev() {
            redacted.replace_range(span.start..span.end, &self.placeholder);
            categories.extend(span.categories.iter().copied());
        }

        Ok(RedactionResult {
            text: redacted,
            redacted_count: merged.len(),
            categories,
        })
    }
}

/// Sort spans and merge the overlapping ones
///
/// Spans that merely touch (`a.end == b.start`) stay separate.
pub fn merge_spans(mut spans: Vec<DetectionSpan>) -> Vec<MergedSpan> {
    spans.sort_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));

    let mut merged: Vec<MergedSpan> = Vec::with_capacity(spans.len());
    for span in spans {
        match merged.last_mut() {
            Some(current) if span.start < current.end => {
                current.end = current.end.max(span.end);
                current.categories.insert(span.category);
            }
            _ => merged.push(MergedSpan {
                start: span.start,
                end: span.end,
                categories: BTreeSet::from([span.category]),
            }),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deidentification::detector::{DenyListDetector, PhiDetector, RegexDetector};
    use crate::domain::PhiScrubError;
    use test_case::test_case;

    fn span(start: usize, end: usize) -> DetectionSpan {
        DetectionSpan::new(start, end, PhiCategory::Person, 1.0, "t")
    }

    fn default_engine() -> RedactionEngine {
        RedactionEngine::with_defaults().unwrap()
    }

    #[test]
    fn test_merge_overlapping() {
        let merged = merge_spans(vec![span(5, 9), span(0, 6), span(12, 14)]);
        assert_eq!(merged.len(), 2);
        assert_eq!((merged[0].start, merged[0].end), (0, 9));
        assert_eq!((merged[1].start, merged[1].end), (12, 14));
    }

    #[test]
    fn test_merge_contained_and_touching() {
        let merged = merge_spans(vec![span(0, 10), span(2, 4), span(10, 12)]);
        assert_eq!(merged.len(), 2);
        assert_eq!((merged[0].start, merged[0].end), (0, 10));
        assert_eq!((merged[1].start, merged[1].end), (10, 12));
    }

    #[test]
    fn test_overlapping_detectors_redact_union() {
        let mut registry = DetectorRegistry::new();
        registry
            .register(Box::new(DenyListDetector::new(
                "hospital",
                PhiCategory::Institute,
                ["St George Hospital"],
            )))
            .unwrap();
        registry
            .register(Box::new(DenyListDetector::new(
                "suburb",
                PhiCategory::Suburb,
                ["George Hospital Road"],
            )))
            .unwrap();
        let engine = RedactionEngine::new(Arc::new(registry));

        let result = engine.redact("at St George Hospital Road today", 0.5).unwrap();
        assert_eq!(result.text, "at [XXXX] today");
        assert_eq!(result.redacted_count, 1);
        assert!(result.categories.contains(&PhiCategory::Institute));
        assert!(result.categories.contains(&PhiCategory::Suburb));
    }

    #[test]
    fn test_threshold_filters_low_confidence() {
        let patterns = vec![r"\d{4}".to_string()];
        let mut registry = DetectorRegistry::new();
        registry
            .register(Box::new(
                RegexDetector::new("postcode", PhiCategory::Postcode, 0.4, &patterns, 1000)
                    .unwrap(),
            ))
            .unwrap();
        let engine = RedactionEngine::new(Arc::new(registry));

        assert_eq!(engine.redact("NSW 2031", 0.5).unwrap().text, "NSW 2031");
        assert_eq!(engine.redact("NSW 2031", 0.3).unwrap().text, "NSW [XXXX]");
    }

    #[test]
    fn test_custom_placeholder() {
        let engine = default_engine().with_placeholder("<redacted>");
        let result = engine.redact("Female", 0.5).unwrap();
        assert_eq!(result.text, "<redacted>");
    }

    #[test]
    fn test_empty_text_is_identity() {
        let result = default_engine().redact("", 0.5).unwrap();
        assert_eq!(result.text, "");
        assert!(!result.is_modified());
    }

    #[test]
    fn test_multibyte_text_around_spans() {
        let result = default_engine().redact("Zoë saw Dr Müller", 0.5).unwrap();
        assert!(result.text.contains("[XXXX]"));
        assert!(result.text.starts_with("Zoë saw "));
    }

    #[test]
    fn test_detector_failure_is_returned() {
        struct Broken;
        impl PhiDetector for Broken {
            fn name(&self) -> &str {
                "broken"
            }
            fn category(&self) -> PhiCategory {
                PhiCategory::Date
            }
            fn detect(&self, _text: &str) -> Result<Vec<DetectionSpan>> {
                Err(PhiScrubError::Detection("boom".into()))
            }
        }

        let mut registry = DetectorRegistry::new();
        registry.register(Box::new(Broken)).unwrap();
        let engine = RedactionEngine::new(Arc::new(registry));
        assert!(engine.redact("John Doe", 0.5).is_err());
    }

    #[test_case("John Doe")]
    #[test_case("Jane Smith")]
    #[test_case("Female")]
    #[test_case("Male")]
    #[test_case("01/01/1980")]
    #[test_case("F")]
    #[test_case("M")]
    #[test_case("19430617")]
    #[test_case("076Y")]
    #[test_case("Dear John Smith")]
    #[test_case("Liverpool Hospital")]
    #[test_case("0412 345 678")]
    #[test_case("12 March 2021")]
    #[test_case("Provider Number: 2345678A")]
    #[test_case("Zoë Ångström")]
    #[test_case("Øster^Åse")]
    fn test_sensitive_values_are_redacted(value: &str) {
        let result = default_engine().redact(value, 0.5).unwrap();
        assert!(result.text.contains("[XXXX]"), "{value} -> {}", result.text);
        assert!(!result.text.contains(value), "{value} -> {}", result.text);
    }

    #[test_case("ÄÖÜ Dr Müller", "Müller")]
    #[test_case("Reviewed by Prof. Smith today", "Smith")]
    #[test_case("seen by DOCTOR Nguyen", "Nguyen")]
    #[test_case("Report cc A/Prof O\x27Brien", "Brien")]
    fn test_titled_surnames_are_redacted(value: &str, surname: &str) {
        let result = default_engine().redact(value, 0.5).unwrap();
        assert!(!result.text.contains(surname), "{value} -> {}", result.text);
        assert!(result.categories.contains(&PhiCategory::Person));
    }

    #[test]
    fn test_modality_dr_is_not_a_titled_name() {
        let result = default_engine().redact("DR Chest", 0.5).unwrap();
        assert_eq!(result.text, "[XXXX] Chest");
    }

    #[test]
    fn test_title_case_phrase_depends_on_threshold() {
        let engine = default_engine();
        assert_eq!(engine.redact("Chest Abdomen Pelvis", 0.5).unwrap().text, "[XXXX]");

        let strict = engine.redact("Chest Abdomen Pelvis", 0.6).unwrap();
        assert_eq!(strict.text, "Chest Abdomen Pelvis");
        assert_eq!(strict.redacted_count, 0);

        // Titled and DICOM-formatted names clear the higher threshold
        assert_eq!(engine.redact("Dr Müller", 0.6).unwrap().text, "[XXXX]");
        assert_eq!(engine.redact("Doe^John", 0.6).unwrap().text, "[XXXX]");
    }

    #[test_case("Not sensitive")]
    #[test_case("Flat tire")]
    #[test_case("Most common")]
    #[test_case("axial t2 flair")]
    fn test_clean_values_are_unchanged(value: &str) {
        let result = default_engine().redact(value, 0.5).unwrap();
        assert_eq!(result.text, value);
        assert_eq!(result.redacted_count, 0);
    }
}

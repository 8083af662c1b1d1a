//! Detection and redaction data models

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// PHI category reported by detectors and recognizers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PhiCategory {
    /// Person names
    Person,
    /// Professional titles (Dr, Prof, ...)
    Title,
    /// Salutations naming the addressee ("Dear John Smith")
    Correspondence,
    Phone,
    MedicalRecordNumber,
    /// Medicare provider numbers
    ProviderNumber,
    Date,
    Street,
    Postcode,
    Suburb,
    State,
    /// Hospitals, clinics, practices
    Institute,
    Gender,
    Age,
    /// NER location mentions
    Location,
    /// NER organisation mentions
    Organization,
}

impl PhiCategory {
    /// Get the upper-case label for the category
    pub fn label(&self) -> &'static str {
        match self {
            Self::Person => "PERSON",
            Self::Title => "TITLE",
            Self::Correspondence => "CORRESPONDENCE",
            Self::Phone => "PHONE",
            Self::MedicalRecordNumber => "MRN",
            Self::ProviderNumber => "PROVIDER_NUMBER",
            Self::Date => "DATE",
            Self::Street => "STREET",
            Self::Postcode => "POSTCODE",
            Self::Suburb => "SUBURB",
            Self::State => "STATE",
            Self::Institute => "INSTITUTE",
            Self::Gender => "GENDER",
            Self::Age => "AGE",
            Self::Location => "LOCATION",
            Self::Organization => "ORGANIZATION",
        }
    }
}

impl fmt::Display for PhiCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for PhiCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "PERSON" | "NAME" | "PER" => Ok(Self::Person),
            "TITLE" => Ok(Self::Title),
            "CORRESPONDENCE" => Ok(Self::Correspondence),
            "PHONE" => Ok(Self::Phone),
            "MRN" | "MEDICAL_RECORD_NUMBER" => Ok(Self::MedicalRecordNumber),
            "PROVIDER_NUMBER" => Ok(Self::ProviderNumber),
            "DATE" => Ok(Self::Date),
            "STREET" => Ok(Self::Street),
            "POSTCODE" => Ok(Self::Postcode),
            "SUBURB" => Ok(Self::Suburb),
            "STATE" => Ok(Self::State),
            "INSTITUTE" => Ok(Self::Institute),
            "GENDER" | "SEX" => Ok(Self::Gender),
            "AGE" => Ok(Self::Age),
            "LOCATION" | "LOC" => Ok(Self::Location),
            "ORGANIZATION" | "ORGANISATION" | "ORG" => Ok(Self::Organization),
            _ => Err(format!("Unknown PHI category: {s}")),
        }
    }
}

/// A PHI span found by one detector
///
/// Offsets are byte offsets into the analysed text and always fall on char
/// boundaries (they come from regex matches or substring searches).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionSpan {
    pub start: usize,
    pub end: usize,
    pub category: PhiCategory,
    /// Always within `[0, 1]`
    pub confidence: f32,
    /// Name of the detector that produced the span
    pub detector: String,
}

impl DetectionSpan {
    pub fn new(
        start: usize,
        end: usize,
        category: PhiCategory,
        confidence: f32,
        detector: impl Into<String>,
    ) -> Self {
        Self {
            start,
            end,
            category,
            confidence: confidence.clamp(0.0, 1.0),
            detector: detector.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn overlaps(&self, other: &DetectionSpan) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Result of redacting one text value
#[derive(Debug, Clone, PartialEq)]
pub struct RedactionResult {
    pub text: String,
    /// Number of merged spans replaced by the placeholder
    pub redacted_count: usize,
    /// Categories of the spans that contributed to the redaction
    pub categories: BTreeSet<PhiCategory>,
}

impl RedactionResult {
    /// A result that leaves `text` untouched
    pub fn unchanged(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            redacted_count: 0,
            categories: BTreeSet::new(),
        }
    }

    pub fn is_modified(&self) -> bool {
        self.redacted_count > 0
    }
}

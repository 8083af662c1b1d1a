//! PHI detection module
//!
//! Provides the trait-based detector interface and the [`DetectorRegistry`]
//! that runs every registered detector over a piece of text.

pub mod deny_list;
pub mod patterns;
pub mod regex;

use crate::deidentification::models::{DetectionSpan, PhiCategory};
use crate::domain::{PhiScrubError, Result};

pub use deny_list::DenyListDetector;
pub use patterns::PatternRegistry;
pub use regex::RegexDetector;

/// Trait for PHI detector implementations
pub trait PhiDetector: Send + Sync {
    /// Unique detector name, used in spans and log fields
    fn name(&self) -> &str;

    /// Category reported for every span this detector produces
    fn category(&self) -> PhiCategory;

    /// Detect PHI spans in `text`
    ///
    /// Spans may overlap each other. An `Err` means the detector could not
    /// finish scanning (for instance a regex hit its backtrack limit).
    fn detect(&self, text: &str) -> Result<Vec<DetectionSpan>>;
}

/// Ordered set of named detectors
///
/// Built once at start-up, then shared read-only (usually behind an `Arc`)
/// by every redaction call.
#[derive(Default)]
pub struct DetectorRegistry {
    detectors: Vec<Box<dyn PhiDetector>>,
}

impl DetectorRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the built-in pattern library
    pub fn with_defaults() -> anyhow::Result<Self> {
        PatternRegistry::default_patterns()?.into_detector_registry()
    }

    /// Add a named detector. Names must be unique.
    pub fn register(&mut self, detector: Box<dyn PhiDetector>) -> Result<()> {
        if self.detectors.iter().any(|d| d.name() == detector.name()) {
            return Err(PhiScrubError::Configuration(format!(
                "Detector '{}' is already registered",
                detector.name()
            )));
        }
        tracing::debug!(
            detector = detector.name(),
            category = %detector.category(),
            "Registered detector"
        );
        self.detectors.push(detector);
        Ok(())
    }

    /// Detector names in registration order
    pub fn names(&self) -> Vec<&str> {
        self.detectors.iter().map(|d| d.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.detectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detectors.is_empty()
    }

    /// Run every detector over `text` in registration order
    ///
    /// Overlap between detectors is left for the redaction engine to resolve.
    /// The first detector failure aborts the analysis of this text.
    pub fn analyze(&self, text: &str) -> Result<Vec<DetectionSpan>> {
        let mut spans = Vec::new();
        for detector in &self.detectors {
            let found = detector.detect(text).map_err(|e| {
                PhiScrubError::Detection(format!("detector '{}': {e}", detector.name()))
            })?;
            spans.extend(found);
        }
        Ok(spans)
    }
}

impl std::fmt::Debug for DetectorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DetectorRegistry")
            .field("detectors", &self.names())
            .finish()
    }
}

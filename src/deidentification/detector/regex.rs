//! Regex-based PHI detector

use super::PhiDetector;
use crate::deidentification::models::{DetectionSpan, PhiCategory};
use crate::domain::{PhiScrubError, Result};
use anyhow::Context;
use fancy_regex::{Regex, RegexBuilder};

/// Default cap on backtracking steps per match attempt
pub const DEFAULT_BACKTRACK_LIMIT: usize = 1_000_000;

/// Detector backed by one or more compiled patterns sharing a score
pub struct RegexDetector {
    name: String,
    category: PhiCategory,
    confidence: f32,
    patterns: Vec<Regex>,
}

impl RegexDetector {
    /// Compile a detector from pattern strings
    pub fn new(
        name: impl Into<String>,
        category: PhiCategory,
        confidence: f32,
        patterns: &[String],
        backtrack_limit: usize,
    ) -> anyhow::Result<Self> {
        let name = name.into();
        let mut compiled = Vec::with_capacity(patterns.len());
        for pattern in patterns {
            let mut builder = RegexBuilder::new(pattern);
            builder.backtrack_limit(backtrack_limit);
            let regex = builder
                .build()
                .with_context(|| format!("Invalid regex in detector '{name}': {pattern}"))?;
            compiled.push(regex);
        }

        Ok(Self {
            name,
            category,
            confidence: confidence.clamp(0.0, 1.0),
            patterns: compiled,
        })
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }
}

impl PhiDetector for RegexDetector {
    fn name(&self) -> &str {
        &self.name
    }

    fn category(&self) -> PhiCategory {
        self.category
    }

    fn detect(&self, text: &str) -> Result<Vec<DetectionSpan>> {
        let mut spans = Vec::new();

        for regex in &self.patterns {
            for found in regex.find_iter(text) {
                let matched = found.map_err(|e| PhiScrubError::Detection(e.to_string()))?;
                if matched.start() == matched.end() {
                    continue;
                }
                spans.push(DetectionSpan::new(
                    matched.start(),
                    matched.end(),
                    self.category,
                    self.confidence,
                    &self.name,
                ));
            }
        }

        Ok(spans)
    }
}

//! Deny-list PHI detector
//!
//! Exact, case-sensitive term matching. A match only counts when it is not
//! glued to surrounding letters or digits, so "Dr" hits "Dr Smith" but not
//! "Drive", and "M" hits "Sex: M" but not "MRI".

use super::PhiDetector;
use crate::deidentification::models::{DetectionSpan, PhiCategory};
use crate::domain::Result;

/// Confidence assigned to every deny-list match
pub const DENY_LIST_CONFIDENCE: f32 = 1.0;

/// Detector matching a fixed vocabulary
pub struct DenyListDetector {
    name: String,
    category: PhiCategory,
    terms: Vec<String>,
}

impl DenyListDetector {
    pub fn new<I, S>(name: impl Into<String>, category: PhiCategory, terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut terms: Vec<String> = terms
            .into_iter()
            .map(Into::into)
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        // Longest first so the longer span is reported before its prefixes
        terms.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        terms.dedup();

        Self {
            name: name.into(),
            category,
            terms,
        }
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// True when `text[start..end]` is not glued to a word character on either side
pub(crate) fn bounded(text: &str, start: usize, end: usize) -> bool {
    let before_ok = text[..start]
        .chars()
        .next_back()
        .map_or(true, |c| !is_word_char(c));
    let after_ok = text[end..].chars().next().map_or(true, |c| !is_word_char(c));
    before_ok && after_ok
}

impl PhiDetector for DenyListDetector {
    fn name(&self) -> &str {
        &self.name
    }

    fn category(&self) -> PhiCategory {
        self.category
    }

    fn detect(&self, text: &str) -> Result<Vec<DetectionSpan>> {
        let mut spans = Vec::new();
        for term in &self.terms {
            for (start, matched) in text.match_indices(term.as_str()) {
                let end = start + matched.len();
                if bounded(text, start, end) {
                    spans.push(DetectionSpan::new(
                        start,
                        end,
                        self.category,
                        DENY_LIST_CONFIDENCE,
                        &self.name,
                    ));
                }
            }
        }
        Ok(spans)
    }
}

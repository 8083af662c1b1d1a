//! Free-text named entity scrubbing
//!
//! A second pass over text that the pattern detectors have already redacted.
//! Each [`EntityRecognizer`] tags entities in the text; every person,
//! location or organisation mention is then replaced wherever it occurs.

pub mod gazetteer;
pub mod http;

use crate::deidentification::engine::DEFAULT_PLACEHOLDER;
use crate::domain::{PhiScrubError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;

pub use gazetteer::GazetteerRecognizer;
pub use http::HttpEntityRecognizer;

/// Entity groups that are scrubbed. Everything else (MISC etc.) is kept.
pub const SCRUBBED_ENTITY_GROUPS: [&str; 3] = ["PER", "LOC", "ORG"];

/// One entity tagged by a recognizer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityMention {
    pub entity_group: String,
    pub word: String,
    #[serde(default)]
    pub score: f32,
    #[serde(default)]
    pub start: Option<usize>,
    #[serde(default)]
    pub end: Option<usize>,
}

impl EntityMention {
    pub fn new(entity_group: impl Into<String>, word: impl Into<String>, score: f32) -> Self {
        Self {
            entity_group: entity_group.into(),
            word: word.into(),
            score,
            start: None,
            end: None,
        }
    }

    /// Whether this mention belongs to a scrubbed entity group
    pub fn is_scrubbed(&self) -> bool {
        SCRUBBED_ENTITY_GROUPS.contains(&self.entity_group.as_str())
    }
}

/// Token-classification backend
#[async_trait]
pub trait EntityRecognizer: Send + Sync {
    /// Name used in log fields and error messages
    fn name(&self) -> &str;

    /// Tag entities in `text`
    async fn recognize(&self, text: &str) -> Result<Vec<EntityMention>>;
}

/// What to do when a recognizer fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NerFailurePolicy {
    /// Abort the run with the recognizer error
    #[default]
    FailFast,
    /// Log a warning and continue with the next recognizer
    FailOpen,
}

impl FromStr for NerFailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fail_fast" | "fail-fast" => Ok(Self::FailFast),
            "fail_open" | "fail-open" => Ok(Self::FailOpen),
            _ => Err(format!(
                "Invalid NER failure policy '{s}'. Must be 'fail_fast' or 'fail_open'"
            )),
        }
    }
}

/// Result of one scrub call
#[derive(Debug, Clone, PartialEq)]
pub struct ScrubOutcome {
    pub text: String,
    /// Occurrences replaced across all recognizers
    pub replaced: usize,
}

impl ScrubOutcome {
    fn unchanged(text: &str) -> Self {
        Self {
            text: text.to_string(),
            replaced: 0,
        }
    }
}

/// Runs the configured recognizers in order over a text value
#[derive(Clone)]
pub struct NerScrubber {
    recognizers: Vec<Arc<dyn EntityRecognizer>>,
    placeholder: String,
    policy: NerFailurePolicy,
}

impl NerScrubber {
    pub fn new(policy: NerFailurePolicy) -> Self {
        Self {
            recognizers: Vec::new(),
            placeholder: DEFAULT_PLACEHOLDER.to_string(),
            policy,
        }
    }

    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = placeholder.into();
        self
    }

    pub fn with_recognizer(mut self, recognizer: Arc<dyn EntityRecognizer>) -> Self {
        self.add_recognizer(recognizer);
        self
    }

    pub fn add_recognizer(&mut self, recognizer: Arc<dyn EntityRecognizer>) {
        tracing::debug!(recognizer = recognizer.name(), "Registered entity recognizer");
        self.recognizers.push(recognizer);
    }

    pub fn policy(&self) -> NerFailurePolicy {
        self.policy
    }

    pub fn recognizer_names(&self) -> Vec<&str> {
        self.recognizers.iter().map(|r| r.name()).collect()
    }

    /// False when no recognizer is configured; scrubbing is then a no-op
    pub fn is_enabled(&self) -> bool {
        !self.recognizers.is_empty()
    }

    /// Replace PER/LOC/ORG mentions in `text`
    ///
    /// Each recognizer sees the output of the previous one. Under
    /// [`NerFailurePolicy::FailFast`] the first recognizer error is returned
    /// as [`PhiScrubError::Recognition`].
    pub async fn scrub(&self, text: &str) -> Result<ScrubOutcome> {
        if text.trim().is_empty() || !self.is_enabled() {
            return Ok(ScrubOutcome::unchanged(text));
        }

        let mut current = text.to_string();
        let mut replaced = 0;

        for recognizer in &self.recognizers {
            let mentions = match recognizer.recognize(&current).await {
                Ok(mentions) => mentions,
                Err(e) => match self.policy {
                    NerFailurePolicy::FailFast => {
                        return Err(PhiScrubError::Recognition(format!(
                            "recognizer '{}': {e}",
                            recognizer.name()
                        )));
                    }
                    NerFailurePolicy::FailOpen => {
                        tracing::warn!(
                            recognizer = recognizer.name(),
                            error = %e,
                            "Entity recognizer failed, continuing without it"
                        );
                        continue;
                    }
                },
            };

            for mention in mentions.iter().filter(|m| m.is_scrubbed()) {
                let word = mention.word.trim();
                if word.is_empty() || word == self.placeholder {
                    continue;
                }
                let hits = current.matches(word).count();
                if hits > 0 {
                    current = current.replace(word, &self.placeholder);
                    replaced += hits;
                }
            }
        }

        Ok(ScrubOutcome {
            text: current,
            replaced,
        })
    }
}

impl std::fmt::Debug for NerScrubber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NerScrubber")
            .field("recognizers", &self.recognizer_names())
            .field("placeholder", &self.placeholder)
            .field("policy", &self.policy)
            .finish()
    }
}

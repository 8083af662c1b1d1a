//! Offline word-list recognizer

use super::{EntityMention, EntityRecognizer};
use crate::deidentification::detector::deny_list::bounded;
use crate::domain::Result;
use async_trait::async_trait;
use std::path::Path;

/// Tags every known term with a fixed entity group
#[derive(Debug, Clone)]
pub struct GazetteerRecognizer {
    name: String,
    entity_group: String,
    terms: Vec<String>,
}

impl GazetteerRecognizer {
    pub fn new<I, S>(name: impl Into<String>, entity_group: impl Into<String>, terms: I) -> Self
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
        terms.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        terms.dedup();

        Self {
            name: name.into(),
            entity_group: entity_group.into(),
            terms,
        }
    }

    /// Load terms from a file, one per line (`#` comments allowed)
    pub fn from_file(
        name: impl Into<String>,
        entity_group: impl Into<String>,
        path: impl AsRef<Path>,
    ) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let terms = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'));
        Ok(Self::new(name, entity_group, terms))
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

#[async_trait]
impl EntityRecognizer for GazetteerRecognizer {
    fn name(&self) -> &str {
        &self.name
    }

    async fn recognize(&self, text: &str) -> Result<Vec<EntityMention>> {
        let mut mentions = Vec::new();
        for term in &self.terms {
            for (start, matched) in text.match_indices(term.as_str()) {
                let end = start + matched.len();
                if bounded(text, start, end) {
                    mentions.push(EntityMention {
                        entity_group: self.entity_group.clone(),
                        word: term.clone(),
                        score: 1.0,
                        start: Some(start),
                        end: Some(end),
                    });
                }
            }
        }
        Ok(mentions)
    }
}

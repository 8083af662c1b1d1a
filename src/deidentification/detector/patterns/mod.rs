//! Pattern library for PHI detection
//!
//! The library is an ordered list of `[[detectors]]` tables. Order matters
//! only for reporting (which detector a merged span is attributed to), but it
//! is preserved so runs are reproducible.

use crate::deidentification::detector::regex::DEFAULT_BACKTRACK_LIMIT;
use crate::deidentification::detector::{
    DenyListDetector, DetectorRegistry, PhiDetector, RegexDetector,
};
use crate::deidentification::models::PhiCategory;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Detector definition from TOML
#[derive(Debug, Clone, Deserialize)]
pub struct DetectorDefinition {
    /// Unique detector name
    pub name: String,
    /// PHI category label
    pub category: String,
    /// Confidence score for pattern matches (0.0 - 1.0)
    #[serde(default = "default_confidence")]
    pub confidence: f32,
    /// Regex patterns
    #[serde(default)]
    pub patterns: Vec<String>,
    /// Exact terms
    #[serde(default)]
    pub deny_list: Vec<String>,
}

fn default_confidence() -> f32 {
    0.5
}

/// Pattern library container
#[derive(Debug, Deserialize)]
struct PatternLibrary {
    #[serde(default)]
    backtrack_limit: Option<usize>,
    #[serde(default)]
    detectors: Vec<DetectorDefinition>,
}

/// Compiled pattern library
///
/// Holds detectors in library order until they are moved into a
/// [`DetectorRegistry`].
pub struct PatternRegistry {
    detectors: Vec<Box<dyn PhiDetector>>,
    backtrack_limit: usize,
}

impl PatternRegistry {
    /// Create a new pattern registry from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).with_context(|| {
            format!(
                "Failed to read pattern library: {}",
                path.as_ref().display()
            )
        })?;

        Self::from_toml(&content)
    }

    /// Create a pattern registry from TOML content
    pub fn from_toml(content: &str) -> Result<Self> {
        let library: PatternLibrary =
            toml::from_str(content).context("Failed to parse pattern library TOML")?;

        let backtrack_limit = library.backtrack_limit.unwrap_or(DEFAULT_BACKTRACK_LIMIT);
        let mut registry = Self {
            detectors: Vec::new(),
            backtrack_limit,
        };

        for def in library.detectors {
            registry.add_definition(def)?;
        }

        Ok(registry)
    }

    /// Create a default pattern registry with built-in patterns
    pub fn default_patterns() -> Result<Self> {
        let default_toml = include_str!("../../../../patterns/phi_patterns.toml");
        Self::from_toml(default_toml)
    }

    /// Compile and append one definition
    ///
    /// A definition with both `patterns` and `deny_list` yields two detectors:
    /// `<name>` for the patterns and `<name>_deny_list` for the terms.
    pub fn add_definition(&mut self, def: DetectorDefinition) -> Result<()> {
        let category = parse_category(&def.category)
            .with_context(|| format!("Invalid category in detector '{}'", def.name))?;

        if def.patterns.is_empty() && def.deny_list.is_empty() {
            anyhow::bail!(
                "Detector '{}' defines neither patterns nor a deny_list",
                def.name
            );
        }
        if !(0.0..=1.0).contains(&def.confidence) {
            anyhow::bail!(
                "Detector '{}' confidence must be within 0.0..=1.0, got {}",
                def.name,
                def.confidence
            );
        }

        let has_patterns = !def.patterns.is_empty();
        if has_patterns {
            let detector = RegexDetector::new(
                def.name.clone(),
                category,
                def.confidence,
                &def.patterns,
                self.backtrack_limit,
            )?;
            self.detectors.push(Box::new(detector));
        }

        if !def.deny_list.is_empty() {
            let name = if has_patterns {
                format!("{}_deny_list", def.name)
            } else {
                def.name.clone()
            };
            self.detectors
                .push(Box::new(DenyListDetector::new(name, category, def.deny_list)));
        }

        Ok(())
    }

    /// Append a deny-list detector read from a word list file
    ///
    /// One term per line; blank lines and lines starting with `#` are skipped.
    pub fn add_deny_list_file(
        &mut self,
        name: &str,
        category: &str,
        path: impl AsRef<Path>,
    ) -> Result<()> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read deny list file: {}", path.display()))?;
        let category = parse_category(category)
            .with_context(|| format!("Invalid category for deny list '{name}'"))?;

        let terms: Vec<&str> = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .collect();

        tracing::debug!(
            deny_list = name,
            path = %path.display(),
            terms = terms.len(),
            "Loaded deny list file"
        );

        self.detectors
            .push(Box::new(DenyListDetector::new(name, category, terms)));
        Ok(())
    }

    /// Detector names in library order
    pub fn detector_names(&self) -> Vec<&str> {
        self.detectors.iter().map(|d| d.name()).collect()
    }

    /// Move the compiled detectors into a registry
    pub fn into_detector_registry(self) -> Result<DetectorRegistry> {
        let mut registry = DetectorRegistry::new();
        for detector in self.detectors {
            registry.register(detector)?;
        }
        Ok(registry)
    }
}

fn parse_category(s: &str) -> Result<PhiCategory> {
    s.parse::<PhiCategory>().map_err(anyhow::Error::msg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_default_patterns() {
        let registry = PatternRegistry::default_patterns().unwrap();
        let names = registry.detector_names();
        assert!(!names.is_empty());
        assert_eq!(names[0], "title");
        assert!(names.contains(&"institute"));
        assert!(names.contains(&"institute_deny_list"));
        assert!(names.contains(&"gender"));
    }

    #[test]
    fn test_from_toml_preserves_order() {
        let toml = r#"
[[detectors]]
name = "zeta"
category = "MRN"
patterns = ['\d{6}']

[[detectors]]
name = "alpha"
category = "STATE"
deny_list = ["NSW"]
"#;
        let registry = PatternRegistry::from_toml(toml).unwrap();
        assert_eq!(registry.detector_names(), vec!["zeta", "alpha"]);
    }

    #[test]
    fn test_unknown_category_is_rejected() {
        let toml = r#"
[[detectors]]
name = "email"
category = "EMAIL"
patterns = ['\S+@\S+']
"#;
        let err = PatternRegistry::from_toml(toml).err().unwrap();
        assert!(format!("{err:#}").contains("EMAIL"));
    }

    #[test]
    fn test_empty_definition_is_rejected() {
        let toml = r#"
[[detectors]]
name = "nothing"
category = "DATE"
"#;
        assert!(PatternRegistry::from_toml(toml).is_err());
    }

    #[test]
    fn test_out_of_range_confidence_is_rejected() {
        let toml = r#"
[[detectors]]
name = "mrn"
category = "MRN"
confidence = 1.5
patterns = ['\d{6}']
"#;
        assert!(PatternRegistry::from_toml(toml).is_err());
    }

    #[test]
    fn test_deny_list_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "# Sydney suburbs").unwrap();
        writeln!(file, "Randwick").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "Kensington").unwrap();
        file.flush().unwrap();

        let mut registry = PatternRegistry::from_toml("").unwrap();
        registry
            .add_deny_list_file("suburb", "SUBURB", file.path())
            .unwrap();

        let registry = registry.into_detector_registry().unwrap();
        let spans = registry.analyze("Lives in Randwick near Kensington").unwrap();
        assert_eq!(spans.len(), 2);
        assert!(spans.iter().all(|s| s.category == PhiCategory::Suburb));
    }

    #[test]
    fn test_missing_deny_list_file() {
        let mut registry = PatternRegistry::from_toml("").unwrap();
        assert!(registry
            .add_deny_list_file("suburb", "SUBURB", "/nonexistent/suburbs.txt")
            .is_err());
    }
}

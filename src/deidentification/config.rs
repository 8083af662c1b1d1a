//! De-identification configuration

use crate::config::SecretString;
use crate::deidentification::dispatch::PERSON_NAME_PLACEHOLDER;
use crate::deidentification::engine::DEFAULT_PLACEHOLDER;
use crate::deidentification::models::PhiCategory;
use crate::deidentification::ner::NerFailurePolicy;
use anyhow::{Context, Result};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Detection and transformation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeidentificationConfig {
    /// Minimum detector confidence for a span to be redacted
    #[serde(default = "default_score_threshold")]
    pub score_threshold: f32,

    /// Run the NER scrubber after pattern redaction
    #[serde(default)]
    pub use_transformers: bool,

    /// Replace pixel data with an 8x8 zero image
    #[serde(default = "default_destroy_pixels")]
    pub destroy_pixels: bool,

    /// Text written over redacted spans
    #[serde(default = "default_placeholder")]
    pub placeholder: String,

    /// Value written over person-name fields
    #[serde(default = "default_person_name_placeholder")]
    pub person_name_placeholder: String,

    /// Pattern library TOML replacing the built-in one
    pub pattern_library: Option<PathBuf>,

    /// Extra deny-list word files
    #[serde(default)]
    pub deny_lists: Vec<DenyListFile>,
}

fn default_score_threshold() -> f32 {
    0.5
}

fn default_destroy_pixels() -> bool {
    true
}

fn default_placeholder() -> String {
    DEFAULT_PLACEHOLDER.to_string()
}

fn default_person_name_placeholder() -> String {
    PERSON_NAME_PLACEHOLDER.to_string()
}

impl Default for DeidentificationConfig {
    fn default() -> Self {
        Self {
            score_threshold: default_score_threshold(),
            use_transformers: false,
            destroy_pixels: default_destroy_pixels(),
            placeholder: default_placeholder(),
            person_name_placeholder: default_person_name_placeholder(),
            pattern_library: None,
            deny_lists: Vec::new(),
        }
    }
}

impl DeidentificationConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.score_threshold) {
            anyhow::bail!(
                "score_threshold must be between 0.0 and 1.0, got {}",
                self.score_threshold
            );
        }

        if self.placeholder.is_empty() {
            anyhow::bail!("placeholder cannot be empty");
        }
        if self.person_name_placeholder.is_empty() {
            anyhow::bail!("person_name_placeholder cannot be empty");
        }

        if let Some(ref path) = self.pattern_library {
            if !path.exists() {
                anyhow::bail!("Pattern library file not found: {}", path.display());
            }
            if path.extension().and_then(|s| s.to_str()) != Some("toml") {
                anyhow::bail!("Pattern library must be a TOML file: {}", path.display());
            }
        }

        for deny_list in &self.deny_lists {
            deny_list
                .validate()
                .with_context(|| format!("Invalid deny list '{}'", deny_list.name))?;
        }

        Ok(())
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(val) = std::env::var("PHISCRUB_DEIDENTIFICATION_SCORE_THRESHOLD") {
            self.score_threshold = val
                .parse()
                .context("Invalid PHISCRUB_DEIDENTIFICATION_SCORE_THRESHOLD value")?;
        }

        if let Ok(val) = std::env::var("PHISCRUB_DEIDENTIFICATION_USE_TRANSFORMERS") {
            self.use_transformers = val
                .parse()
                .context("Invalid PHISCRUB_DEIDENTIFICATION_USE_TRANSFORMERS value")?;
        }

        if let Ok(val) = std::env::var("PHISCRUB_DEIDENTIFICATION_DESTROY_PIXELS") {
            self.destroy_pixels = val
                .parse()
                .context("Invalid PHISCRUB_DEIDENTIFICATION_DESTROY_PIXELS value")?;
        }

        if let Ok(val) = std::env::var("PHISCRUB_DEIDENTIFICATION_PATTERN_LIBRARY") {
            self.pattern_library = Some(PathBuf::from(val));
        }

        Ok(())
    }
}

/// Word list file loaded as an extra deny-list detector
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DenyListFile {
    pub name: String,
    /// PHI category label, e.g. `SUBURB`
    pub category: String,
    pub path: PathBuf,
}

impl DenyListFile {
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            anyhow::bail!("deny list name cannot be empty");
        }
        self.category
            .parse::<PhiCategory>()
            .map_err(anyhow::Error::msg)?;
        if !self.path.exists() {
            anyhow::bail!("Deny list file not found: {}", self.path.display());
        }
        Ok(())
    }
}

/// NER scrubber configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NerConfig {
    #[serde(default)]
    pub failure_policy: NerFailurePolicy,

    /// Recognizers, run in the listed order
    #[serde(default)]
    pub recognizers: Vec<RecognizerConfig>,
}

impl NerConfig {
    pub fn validate(&self) -> Result<()> {
        let mut names = std::collections::HashSet::new();
        for recognizer in &self.recognizers {
            if !names.insert(recognizer.name()) {
                anyhow::bail!("Duplicate recognizer name '{}'", recognizer.name());
            }
            recognizer
                .validate()
                .with_context(|| format!("Invalid recognizer '{}'", recognizer.name()))?;
        }
        Ok(())
    }
}

/// One entity recognizer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RecognizerConfig {
    /// Token-classification inference endpoint
    Http {
        name: String,
        endpoint: String,
        #[serde(default)]
        api_token: Option<SecretString>,
        #[serde(default = "default_timeout_seconds")]
        timeout_seconds: u64,
    },
    /// Offline word list
    Gazetteer {
        name: String,
        path: PathBuf,
        #[serde(default = "default_entity_group")]
        entity_group: String,
    },
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_entity_group() -> String {
    "PER".to_string()
}

impl RecognizerConfig {
    pub fn name(&self) -> &str {
        match self {
            Self::Http { name, .. } | Self::Gazetteer { name, .. } => name,
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Http {
                endpoint,
                api_token,
                timeout_seconds,
                ..
            } => {
                url::Url::parse(endpoint)
                    .with_context(|| format!("Invalid endpoint URL: {endpoint}"))?;
                if api_token.as_ref().is_some_and(|t| t.expose_secret().is_empty()) {
                    anyhow::bail!("api_token cannot be blank");
                }
                if *timeout_seconds == 0 {
                    anyhow::bail!("timeout_seconds must be greater than 0");
                }
            }
            Self::Gazetteer {
                path, entity_group, ..
            } => {
                if !path.exists() {
                    anyhow::bail!("Gazetteer file not found: {}", path.display());
                }
                if entity_group.is_empty() {
                    anyhow::bail!("entity_group cannot be empty");
                }
            }
        }
        Ok(())
    }
}

/// Audit trail configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Enable audit logging
    #[serde(default)]
    pub enabled: bool,

    /// Audit log file path
    #[serde(default = "default_audit_log_path")]
    pub log_path: PathBuf,

    /// JSON lines (true) or one plain text line per record
    #[serde(default = "default_audit_json_format")]
    pub json_format: bool,
}

fn default_audit_log_path() -> PathBuf {
    PathBuf::from("./audit/deidentification.log")
}

fn default_audit_json_format() -> bool {
    true
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            log_path: default_audit_log_path(),
            json_format: default_audit_json_format(),
        }
    }
}

impl AuditConfig {
    pub fn validate(&self) -> Result<()> {
        if self.enabled && self.log_path.as_os_str().is_empty() {
            anyhow::bail!("audit log_path cannot be empty when audit is enabled");
        }
        Ok(())
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(val) = std::env::var("PHISCRUB_AUDIT_ENABLED") {
            self.enabled = val
                .parse()
                .context("Invalid PHISCRUB_AUDIT_ENABLED value")?;
        }

        if let Ok(val) = std::env::var("PHISCRUB_AUDIT_LOG_PATH") {
            self.log_path = PathBuf::from(val);
        }

        Ok(())
    }
}

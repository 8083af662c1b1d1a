//! Filesystem store documents
//!
//! Each session directory holds a `manifest.json` describing its entries
//! and a `data/` directory with one sub-directory per entry.

use crate::domain::{DataType, EntryDescriptor};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Name of the per-session manifest file
pub const MANIFEST_FILE: &str = "manifest.json";

/// Name of the per-session data directory
pub const DATA_DIR: &str = "data";

/// Session manifest
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionManifest {
    /// Entries in stored order
    #[serde(default)]
    pub entries: Vec<ManifestEntry>,
}

impl SessionManifest {
    pub fn find(&self, name: &str) -> Option<&ManifestEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn find_mut(&mut self, name: &str) -> Option<&mut ManifestEntry> {
        self.entries.iter_mut().find(|e| e.name == name)
    }
}

/// One entry of the manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub name: String,
    pub datatype: DataType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub derived_from: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Files in series order
    #[serde(default)]
    pub files: Vec<ManifestFile>,
}

impl ManifestEntry {
    pub fn new(descriptor: &EntryDescriptor) -> Self {
        Self {
            name: descriptor.name.clone(),
            datatype: descriptor.datatype.clone(),
            derived_from: descriptor.derived_from.clone(),
            created_at: Utc::now(),
            files: Vec::new(),
        }
    }

    pub fn descriptor(&self) -> EntryDescriptor {
        EntryDescriptor {
            name: self.name.clone(),
            datatype: self.datatype.clone(),
            derived_from: self.derived_from.clone(),
        }
    }
}

/// One stored file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestFile {
    pub name: String,
    /// SHA-256 of the content
    pub checksum: String,
    pub size: u64,
}

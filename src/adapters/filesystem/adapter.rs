//! Directory-backed record store
//!
//! Layout:
//!
//! ```text
//! <root>/<session>/manifest.json
//! <root>/<session>/data/<encoded entry name>/<file name>
//! ```
//!
//! Entry names are percent-encoded into a single directory component, so
//! `CT/DICOM` and `CT@deidentified` never nest or collide.

use super::models::{ManifestEntry, ManifestFile, SessionManifest, DATA_DIR, MANIFEST_FILE};
use crate::adapters::store::RecordStore;
use crate::deidentification::audit::hash_value;
use crate::domain::{
    DataType, EntryDescriptor, PhiScrubError, Result, Series, SeriesFile, SessionId,
};
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tokio::sync::Mutex;

/// Record store over a local directory tree
pub struct FileSystemRecordStore {
    root: PathBuf,
    manifest_lock: Mutex<()>,
}

impl FileSystemRecordStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            manifest_lock: Mutex::new(()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create an empty session directory with its manifest
    pub async fn create_session(&self, session: &SessionId) -> Result<()> {
        let dir = self.session_dir(session);
        tokio::fs::create_dir_all(dir.join(DATA_DIR)).await?;
        if !tokio::fs::try_exists(dir.join(MANIFEST_FILE)).await? {
            self.save_manifest(session, &SessionManifest::default()).await?;
        }
        tracing::debug!(session = %session, path = %dir.display(), "Created session");
        Ok(())
    }

    fn session_dir(&self, session: &SessionId) -> PathBuf {
        self.root.join(session.as_str())
    }

    /// One directory per entry under `data/`
    ///
    /// Names are form-urlencoded with dots escaped too, so `.` and `..`
    /// cannot resolve outside `data/`.
    fn entry_dir(&self, session: &SessionId, entry: &str) -> PathBuf {
        self.session_dir(session)
            .join(DATA_DIR)
            .join(encode_entry_name(entry))
    }

    async fn load_manifest(&self, session: &SessionId) -> Result<SessionManifest> {
        let path = self.session_dir(session).join(MANIFEST_FILE);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(PhiScrubError::SessionNotFound(session.to_string()));
            }
            Err(e) => {
                return Err(PhiScrubError::Store(format!(
                    "Failed to read manifest {}: {e}",
                    path.display()
                )));
            }
        };
        serde_json::from_str(&content).map_err(|e| {
            PhiScrubError::Store(format!("Corrupt manifest {}: {e}", path.display()))
        })
    }

    async fn save_manifest(&self, session: &SessionId, manifest: &SessionManifest) -> Result<()> {
        let path = self.session_dir(session).join(MANIFEST_FILE);
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_vec_pretty(manifest)?;
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }
}

/// Reject absolute paths and parent references in stored file names
fn safe_relative(name: &str) -> Result<&Path> {
    let path = Path::new(name);
    let ok = !name.is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
    if ok {
        Ok(path)
    } else {
        Err(PhiScrubError::Store(format!("Unsafe file name in series: {name}")))
    }
}

#[async_trait]
impl RecordStore for FileSystemRecordStore {
    async fn list_entries(&self, session: &SessionId) -> Result<Vec<EntryDescriptor>> {
        let manifest = self.load_manifest(session).await?;
        Ok(manifest.entries.iter().map(ManifestEntry::descriptor).collect())
    }

    async fn read_series(&self, session: &SessionId, entry: &str) -> Result<Series> {
        let manifest = self.load_manifest(session).await?;
        let stored = manifest
            .find(entry)
            .ok_or_else(|| PhiScrubError::EntryNotFound(format!("{session}/{entry}")))?;

        let dir = self.entry_dir(session, entry);
        let mut files = Vec::with_capacity(stored.files.len());
        for file in &stored.files {
            let path = dir.join(safe_relative(&file.name)?);
            let content = tokio::fs::read(&path).await.map_err(|e| {
                PhiScrubError::Store(format!("Failed to read {}: {e}", path.display()))
            })?;
            files.push(SeriesFile::new(file.name.clone(), content));
        }

        Ok(Series::new(files))
    }

    async fn create_entry(
        &self,
        session: &SessionId,
        name: &str,
        datatype: DataType,
        derived_from: Option<&str>,
    ) -> Result<EntryDescriptor> {
        if name.is_empty() {
            return Err(PhiScrubError::Validation(
                "Entry name cannot be empty".to_string(),
            ));
        }

        let _guard = self.manifest_lock.lock().await;
        let mut manifest = self.load_manifest(session).await?;
        if manifest.find(name).is_some() {
            return Err(PhiScrubError::EntryExists(format!("{session}/{name}")));
        }

        let mut descriptor = EntryDescriptor::new(name, datatype);
        if let Some(source) = derived_from {
            descriptor = descriptor.derived(source);
        }

        tokio::fs::create_dir_all(self.entry_dir(session, name)).await?;
        manifest.entries.push(ManifestEntry::new(&descriptor));
        self.save_manifest(session, &manifest).await?;

        tracing::debug!(session = %session, entry = %name, "Created entry");
        Ok(descriptor)
    }

    async fn write_series(&self, session: &SessionId, entry: &str, series: Series) -> Result<()> {
        let _guard = self.manifest_lock.lock().await;
        let mut manifest = self.load_manifest(session).await?;
        if manifest.find(entry).is_none() {
            return Err(PhiScrubError::EntryNotFound(format!("{session}/{entry}")));
        }

        let dir = self.entry_dir(session, entry);
        let mut stored_files = Vec::with_capacity(series.len());
        for file in &series.files {
            let path = dir.join(safe_relative(&file.name)?);
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&path, &file.content).await.map_err(|e| {
                PhiScrubError::Store(format!("Failed to write {}: {e}", path.display()))
            })?;
            stored_files.push(ManifestFile {
                name: file.name.clone(),
                checksum: hash_value(&file.content),
                size: file.content.len() as u64,
            });
        }

        if let Some(stored) = manifest.find_mut(entry) {
            stored.files = stored_files;
        }
        self.save_manifest(session, &manifest).await
    }
}

fn encode_entry_name(entry: &str) -> String {
    url::form_urlencoded::byte_serialize(entry.as_bytes())
        .collect::<String>()
        .replace('.', "%2E")
}

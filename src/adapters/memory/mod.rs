//! In-memory record store
//!
//! Backs the test suite and the `scan` preview. Interior mutability only;
//! there is a single writer.

use crate::adapters::store::RecordStore;
use crate::domain::{
    DataType, EntryDescriptor, PhiScrubError, Result, Series, SessionId,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

struct StoredEntry {
    descriptor: EntryDescriptor,
    series: Series,
}

/// Record store held entirely in memory
#[derive(Default)]
pub struct InMemoryRecordStore {
    sessions: Mutex<HashMap<String, Vec<StoredEntry>>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, Vec<StoredEntry>>>> {
        self.sessions
            .lock()
            .map_err(|_| PhiScrubError::Store("in-memory store lock poisoned".to_string()))
    }

    /// Create an empty session (no-op if it exists)
    pub fn create_session(&self, session: &SessionId) -> Result<()> {
        self.lock()?.entry(session.to_string()).or_default();
        Ok(())
    }

    /// Seed an entry with its files, creating the session if needed
    pub fn insert_entry(
        &self,
        session: &SessionId,
        descriptor: EntryDescriptor,
        series: Series,
    ) -> Result<()> {
        let mut sessions = self.lock()?;
        let entries = sessions.entry(session.to_string()).or_default();
        if entries.iter().any(|e| e.descriptor.name == descriptor.name) {
            return Err(PhiScrubError::EntryExists(descriptor.name));
        }
        entries.push(StoredEntry { descriptor, series });
        Ok(())
    }

    /// Entry names of a session in stored order
    pub fn entry_names(&self, session: &SessionId) -> Result<Vec<String>> {
        let sessions = self.lock()?;
        let entries = sessions
            .get(session.as_str())
            .ok_or_else(|| PhiScrubError::SessionNotFound(session.to_string()))?;
        Ok(entries.iter().map(|e| e.descriptor.name.clone()).collect())
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn list_entries(&self, session: &SessionId) -> Result<Vec<EntryDescriptor>> {
        let sessions = self.lock()?;
        let entries = sessions
            .get(session.as_str())
            .ok_or_else(|| PhiScrubError::SessionNotFound(session.to_string()))?;
        Ok(entries.iter().map(|e| e.descriptor.clone()).collect())
    }

    async fn read_series(&self, session: &SessionId, entry: &str) -> Result<Series> {
        let sessions = self.lock()?;
        let entries = sessions
            .get(session.as_str())
            .ok_or_else(|| PhiScrubError::SessionNotFound(session.to_string()))?;
        entries
            .iter()
            .find(|e| e.descriptor.name == entry)
            .map(|e| e.series.clone())
            .ok_or_else(|| PhiScrubError::EntryNotFound(format!("{session}/{entry}")))
    }

    async fn create_entry(
        &self,
        session: &SessionId,
        name: &str,
        datatype: DataType,
        derived_from: Option<&str>,
    ) -> Result<EntryDescriptor> {
        let mut sessions = self.lock()?;
        let entries = sessions
            .get_mut(session.as_str())
            .ok_or_else(|| PhiScrubError::SessionNotFound(session.to_string()))?;
        if entries.iter().any(|e| e.descriptor.name == name) {
            return Err(PhiScrubError::EntryExists(format!("{session}/{name}")));
        }

        let mut descriptor = EntryDescriptor::new(name, datatype);
        if let Some(source) = derived_from {
            descriptor = descriptor.derived(source);
        }
        entries.push(StoredEntry {
            descriptor: descriptor.clone(),
            series: Series::default(),
        });
        Ok(descriptor)
    }

    async fn write_series(&self, session: &SessionId, entry: &str, series: Series) -> Result<()> {
        let mut sessions = self.lock()?;
        let entries = sessions
            .get_mut(session.as_str())
            .ok_or_else(|| PhiScrubError::SessionNotFound(session.to_string()))?;
        let stored = entries
            .iter_mut()
            .find(|e| e.descriptor.name == entry)
            .ok_or_else(|| PhiScrubError::EntryNotFound(format!("{session}/{entry}")))?;
        stored.series = series;
        Ok(())
    }
}

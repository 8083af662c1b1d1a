//! Record store traits
//!
//! This module defines the trait that record store adapters must implement
//! to work with phiscrub.

use crate::domain::{DataType, EntryDescriptor, Result, Series, SessionId};
use async_trait::async_trait;

/// Session/entry storage
///
/// Sessions are created outside phiscrub. The pipeline lists, reads, creates
/// and writes entries; it never deletes anything.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// List the entries of a session in stored order
    ///
    /// # Errors
    ///
    /// Returns [`SessionNotFound`](crate::domain::PhiScrubError::SessionNotFound)
    /// if the session does not exist or cannot be listed.
    async fn list_entries(&self, session: &SessionId) -> Result<Vec<EntryDescriptor>>;

    /// Read every file of an entry, in stored order
    ///
    /// # Errors
    ///
    /// Returns [`EntryNotFound`](crate::domain::PhiScrubError::EntryNotFound)
    /// if the entry does not exist.
    async fn read_series(&self, session: &SessionId, entry: &str) -> Result<Series>;

    /// Create a new, empty entry
    ///
    /// # Arguments
    ///
    /// * `name` - Entry name, unique within the session
    /// * `datatype` - Datatype tag of the new entry
    /// * `derived_from` - Source entry when creating a derivative
    ///
    /// # Errors
    ///
    /// Returns [`EntryExists`](crate::domain::PhiScrubError::EntryExists) if
    /// an entry with that name is already present.
    async fn create_entry(
        &self,
        session: &SessionId,
        name: &str,
        datatype: DataType,
        derived_from: Option<&str>,
    ) -> Result<EntryDescriptor>;

    /// Store the files of an entry, preserving their order
    async fn write_series(&self, session: &SessionId, entry: &str, series: Series) -> Result<()>;
}

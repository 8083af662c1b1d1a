//! Filesystem record store
//!
//! Sessions are directories under a configured root; see [`adapter`] for the
//! on-disk layout.

pub mod adapter;
pub mod models;

pub use adapter::FileSystemRecordStore;
pub use models::{ManifestEntry, SessionManifest};

//! External system integrations for phiscrub.
//!
//! This module provides adapters for the systems the pipeline reads from and
//! writes to:
//!
//! - [`store`] - Record store abstraction layer (trait-based)
//! - [`filesystem`] - Directory-backed record store
//! - [`memory`] - In-process record store for tests and previews
//! - [`codec`] - Image encoding and decoding
//!
//! # Design Pattern
//!
//! Adapters follow the **Adapter Pattern** to isolate external dependencies and
//! enable testing with in-memory implementations. The orchestrator only ever
//! sees `Arc<dyn RecordStore>` and `Arc<dyn ImageCodec>`.
//!
//! ```rust,no_run
//! use phiscrub::adapters::filesystem::FileSystemRecordStore;
//! use phiscrub::adapters::store::RecordStore;
//! use phiscrub::domain::SessionId;
//!
//! # async fn example() -> phiscrub::domain::Result<()> {
//! let store = FileSystemRecordStore::new("/data/research-store");
//! let session = SessionId::new("MR-2024-0042").map_err(phiscrub::domain::PhiScrubError::Validation)?;
//! for entry in store.list_entries(&session).await? {
//!     println!("{} ({})", entry.name, entry.datatype);
//! }
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod filesystem;
pub mod memory;
pub mod store;

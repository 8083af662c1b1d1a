//! Record store abstraction layer
//!
//! This module provides the trait every session/entry backend implements so
//! the orchestrator can work against the filesystem store or the in-memory
//! store interchangeably.

pub mod traits;

pub use traits::RecordStore;

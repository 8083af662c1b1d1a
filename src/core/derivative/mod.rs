//! Derivative creation
//!
//! This module walks a session, de-identifies every eligible DICOM series and
//! stores the result as a linked derivative entry.

pub mod inventory;
pub mod orchestrator;
pub mod summary;

pub use inventory::count_records;
pub use orchestrator::{skip_reason, DerivativeOrchestrator, EntrySkipReason};
pub use summary::{DeidError, DeidErrorType, DeidentificationSummary};

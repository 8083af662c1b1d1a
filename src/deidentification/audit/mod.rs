//! Audit trail for de-identified records
//!
//! One line per transformed record. Original values appear only as SHA-256
//! hashes.

pub mod logger;

pub use logger::{hash_value, AuditLogger, FieldAudit, RecordAudit};

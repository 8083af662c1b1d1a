//! Data models shared by the detection, redaction and dispatch stages

pub mod detection;

pub use detection::{DetectionSpan, PhiCategory, RedactionResult};

//! Domain models and types for phiscrub.
//!
//! The domain layer provides:
//! - **Strongly-typed identifiers** ([`SessionId`], [`RunId`])
//! - **Image model** ([`ImageRecord`], [`MetadataField`], [`FieldValue`], [`PixelData`])
//! - **Value representations** ([`Vr`], [`FieldCategory`])
//! - **Store entries** ([`EntryDescriptor`], [`Series`]) and derivative naming
//! - **Error types** ([`PhiScrubError`]) and the [`Result`] alias
//!
//! # Example
//!
//! ```rust
//! use phiscrub::domain::{DicomTag, FieldCategory, FieldValue, ImageRecord, MetadataField, Vr};
//!
//! let record = ImageRecord::new("1.2.840.1").with_field(MetadataField::new(
//!     DicomTag::PATIENT_NAME,
//!     Vr::PN,
//!     FieldValue::Text("Doe^John".to_string()),
//! ));
//!
//! let field = record.field(DicomTag::PATIENT_NAME).unwrap();
//! assert_eq!(field.vr.category(), FieldCategory::PersonName);
//! ```

pub mod entry;
pub mod errors;
pub mod ids;
pub mod record;
pub mod result;
pub mod vr;

// Re-export commonly used types for convenience
pub use entry::{
    derivative_entry_name, derivative_file_name, DataType, EntryDescriptor, Series, SeriesFile,
};
pub use errors::PhiScrubError;
pub use ids::{RunId, SessionId};
pub use record::{DicomTag, FieldValue, ImageRecord, MetadataField, PixelData};
pub use result::Result;
pub use vr::{FieldCategory, Vr};

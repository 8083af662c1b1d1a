//! Pixel data destruction
//!
//! Burned-in annotations can carry PHI, so when enabled the whole pixel
//! payload is swapped for a tiny all-zero image and the shape attributes are
//! rewritten to match.

use crate::domain::{DicomTag, FieldValue, ImageRecord, MetadataField, PixelData, Vr};

/// Rows and columns of the replacement image
pub const DESTROYED_SIZE: u16 = 8;

/// Replace the pixel payload with an 8×8 single-frame zero buffer
///
/// Samples per pixel and bits allocated are kept. Rows and Columns are set
/// to 8 and NumberOfFrames to 1 when that attribute is present. A record
/// without pixel data is returned as is.
pub fn destroy_pixels(mut record: ImageRecord) -> ImageRecord {
    let Some(pixels) = record.pixel_data.as_ref() else {
        return record;
    };

    let zeroed = PixelData::zeroed(
        DESTROYED_SIZE,
        DESTROYED_SIZE,
        1,
        pixels.samples_per_pixel,
        pixels.bits_allocated,
    );
    record.pixel_data = Some(zeroed);

    set_count(&mut record, DicomTag::ROWS, Vr::US, i64::from(DESTROYED_SIZE));
    set_count(&mut record, DicomTag::COLUMNS, Vr::US, i64::from(DESTROYED_SIZE));
    if let Some(frames) = record.field_mut(DicomTag::NUMBER_OF_FRAMES) {
        frames.value = numeric_like(&frames.value, 1);
    }

    record
}

fn set_count(record: &mut ImageRecord, tag: DicomTag, vr: Vr, value: i64) {
    match record.field_mut(tag) {
        Some(field) => field.value = numeric_like(&field.value, value),
        None => record.insert(MetadataField::new(tag, vr, FieldValue::Integer(vec![value]))),
    }
}

/// Keep the textual or binary flavour of the existing value
fn numeric_like(existing: &FieldValue, value: i64) -> FieldValue {
    match existing {
        FieldValue::Text(_) | FieldValue::Multi(_) => FieldValue::Text(value.to_string()),
        _ => FieldValue::Integer(vec![value]),
    }
}

//! Image record model
//!
//! An [`ImageRecord`] is one decoded image file: an ordered map of metadata
//! fields keyed by DICOM tag, plus an optional pixel payload.

use super::vr::Vr;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// DICOM attribute tag `(group, element)`
///
/// Serialized as the 8 hex digit form used as keys by DICOM JSON (`"00100010"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DicomTag {
    pub group: u16,
    pub element: u16,
}

impl DicomTag {
    pub const PATIENT_NAME: DicomTag = DicomTag::new(0x0010, 0x0010);
    pub const PATIENT_ID: DicomTag = DicomTag::new(0x0010, 0x0020);
    pub const PATIENT_BIRTH_DATE: DicomTag = DicomTag::new(0x0010, 0x0030);
    pub const PATIENT_SEX: DicomTag = DicomTag::new(0x0010, 0x0040);
    pub const PATIENT_AGE: DicomTag = DicomTag::new(0x0010, 0x1010);
    pub const REFERRING_PHYSICIAN_NAME: DicomTag = DicomTag::new(0x0008, 0x0090);
    pub const INSTITUTION_NAME: DicomTag = DicomTag::new(0x0008, 0x0080);
    pub const STUDY_DESCRIPTION: DicomTag = DicomTag::new(0x0008, 0x1030);
    pub const SOP_INSTANCE_UID: DicomTag = DicomTag::new(0x0008, 0x0018);
    pub const NUMBER_OF_FRAMES: DicomTag = DicomTag::new(0x0028, 0x0008);
    pub const ROWS: DicomTag = DicomTag::new(0x0028, 0x0010);
    pub const COLUMNS: DicomTag = DicomTag::new(0x0028, 0x0011);

    pub const fn new(group: u16, element: u16) -> Self {
        Self { group, element }
    }
}

impl fmt::Display for DicomTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:04X},{:04X})", self.group, self.element)
    }
}

impl FromStr for DicomTag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex: String = s
            .chars()
            .filter(|c| !matches!(c, '(' | ')' | ',' | ' '))
            .collect();
        if hex.len() != 8 {
            return Err(format!("Invalid DICOM tag: {s}"));
        }
        let group =
            u16::from_str_radix(&hex[..4], 16).map_err(|_| format!("Invalid DICOM tag: {s}"))?;
        let element =
            u16::from_str_radix(&hex[4..], 16).map_err(|_| format!("Invalid DICOM tag: {s}"))?;
        Ok(Self { group, element })
    }
}

impl TryFrom<String> for DicomTag {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DicomTag> for String {
    fn from(tag: DicomTag) -> Self {
        format!("{:04X}{:04X}", tag.group, tag.element)
    }
}

/// Value carried by a metadata field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    /// Single string value
    Text(String),
    /// Multi-valued string (DICOM backslash-separated values)
    Multi(Vec<String>),
    Integer(Vec<i64>),
    Float(Vec<f64>),
    /// Raw bytes, base64 in JSON
    Bytes(#[serde(with = "base64_bytes")] Vec<u8>),
    Empty,
}

impl FieldValue {
    /// The value as a single string, if it is textual
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            FieldValue::Multi(values) => values.first().map(String::as_str),
            _ => None,
        }
    }

    /// Whether the value carries no content at all
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Text(s) => s.is_empty(),
            FieldValue::Multi(values) => values.iter().all(String::is_empty),
            FieldValue::Integer(v) => v.is_empty(),
            FieldValue::Float(v) => v.is_empty(),
            FieldValue::Bytes(b) => b.is_empty(),
            FieldValue::Empty => true,
        }
    }

    /// Canonical string form used for hashing in the audit trail
    pub fn digest_input(&self) -> Vec<u8> {
        match self {
            FieldValue::Text(s) => s.as_bytes().to_vec(),
            FieldValue::Multi(values) => values.join("\\").into_bytes(),
            FieldValue::Integer(v) => format!("{v:?}").into_bytes(),
            FieldValue::Float(v) => format!("{v:?}").into_bytes(),
            FieldValue::Bytes(b) => b.clone(),
            FieldValue::Empty => Vec::new(),
        }
    }
}

/// One metadata element of an image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataField {
    pub tag: DicomTag,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keyword: Option<String>,
    pub vr: Vr,
    pub value: FieldValue,
}

impl MetadataField {
    pub fn new(tag: DicomTag, vr: Vr, value: FieldValue) -> Self {
        Self {
            tag,
            keyword: None,
            vr,
            value,
        }
    }

    pub fn with_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keyword = Some(keyword.into());
        self
    }

    /// Keyword if known, tag otherwise. Used in log fields.
    pub fn label(&self) -> String {
        self.keyword
            .clone()
            .unwrap_or_else(|| self.tag.to_string())
    }
}

/// Pixel payload with its shape descriptor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PixelData {
    pub rows: u16,
    pub columns: u16,
    pub frames: u32,
    pub samples_per_pixel: u16,
    pub bits_allocated: u16,
    #[serde(with = "base64_bytes")]
    pub data: Vec<u8>,
}

impl PixelData {
    /// Creates an all-zero buffer sized for the given shape
    pub fn zeroed(
        rows: u16,
        columns: u16,
        frames: u32,
        samples_per_pixel: u16,
        bits_allocated: u16,
    ) -> Self {
        let len = Self::byte_len(rows, columns, frames, samples_per_pixel, bits_allocated);
        Self {
            rows,
            columns,
            frames,
            samples_per_pixel,
            bits_allocated,
            data: vec![0; len],
        }
    }

    /// `(frames, rows, columns)`
    pub fn shape(&self) -> (u32, u16, u16) {
        (self.frames, self.rows, self.columns)
    }

    pub fn is_all_zero(&self) -> bool {
        self.data.iter().all(|b| *b == 0)
    }

    fn byte_len(
        rows: u16,
        columns: u16,
        frames: u32,
        samples_per_pixel: u16,
        bits_allocated: u16,
    ) -> usize {
        let bytes_per_sample = (usize::from(bits_allocated) + 7) / 8;
        usize::from(rows)
            * usize::from(columns)
            * frames as usize
            * usize::from(samples_per_pixel.max(1))
            * bytes_per_sample.max(1)
    }
}

/// A decoded image: metadata fields plus optional pixel data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRecord {
    /// SOP instance UID or another stable identifier
    pub id: String,
    #[serde(default)]
    pub fields: BTreeMap<DicomTag, MetadataField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pixel_data: Option<PixelData>,
}

impl ImageRecord {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fields: BTreeMap::new(),
            pixel_data: None,
        }
    }

    /// Inserts (or replaces) a field
    pub fn with_field(mut self, field: MetadataField) -> Self {
        self.insert(field);
        self
    }

    pub fn with_pixel_data(mut self, pixel_data: PixelData) -> Self {
        self.pixel_data = Some(pixel_data);
        self
    }

    pub fn insert(&mut self, field: MetadataField) {
        self.fields.insert(field.tag, field);
    }

    pub fn field(&self, tag: DicomTag) -> Option<&MetadataField> {
        self.fields.get(&tag)
    }

    pub fn field_mut(&mut self, tag: DicomTag) -> Option<&mut MetadataField> {
        self.fields.get_mut(&tag)
    }

    /// Text of a field, if present and textual
    pub fn text(&self, tag: DicomTag) -> Option<&str> {
        self.field(tag).and_then(|f| f.value.as_text())
    }
}

mod base64_bytes {
    use super::*;

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

//! Session entries, series and derivative naming

use serde::{Deserialize, Serialize};
use std::fmt;

/// Suffix marking a derivative entry
pub const DERIVATIVE_SUFFIX: &str = "@deidentified";

/// Trailing marker replaced by [`DERIVATIVE_SUFFIX`] when present
pub const DICOM_MARKER: &str = "/DICOM";

/// Datatype tag of a session entry
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    /// A series of DICOM image files
    DicomSeries,
    /// Anything else the store holds (reports, spreadsheets, ...)
    Other(String),
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::DicomSeries => f.write_str("dicom_series"),
            DataType::Other(name) => write!(f, "other:{name}"),
        }
    }
}

/// Descriptor of a session entry as listed by the record store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryDescriptor {
    pub name: String,
    pub datatype: DataType,
    /// Name of the source entry when this entry is a derivative
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub derived_from: Option<String>,
}

impl EntryDescriptor {
    pub fn new(name: impl Into<String>, datatype: DataType) -> Self {
        Self {
            name: name.into(),
            datatype,
            derived_from: None,
        }
    }

    pub fn derived(mut self, source: impl Into<String>) -> Self {
        self.derived_from = Some(source.into());
        self
    }

    /// Derivative status comes from the stored linkage, not the name
    pub fn is_derivative(&self) -> bool {
        self.derived_from.is_some()
    }
}

/// A file-like item of a series
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesFile {
    /// Relative file name, may contain `/`
    pub name: String,
    pub content: Vec<u8>,
}

impl SeriesFile {
    pub fn new(name: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content,
        }
    }
}

/// Ordered sequence of files held by an entry
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Series {
    pub files: Vec<SeriesFile>,
}

impl Series {
    pub fn new(files: Vec<SeriesFile>) -> Self {
        Self { files }
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Name of the derivative entry for `source`
///
/// ```
/// use phiscrub::domain::entry::derivative_entry_name;
///
/// assert_eq!(derivative_entry_name("CT/DICOM"), "CT@deidentified");
/// assert_eq!(derivative_entry_name("CT"), "CT@deidentified");
/// ```
pub fn derivative_entry_name(source: &str) -> String {
    match source.strip_suffix(DICOM_MARKER) {
        Some(stem) => format!("{stem}{DERIVATIVE_SUFFIX}"),
        None => format!("{source}{DERIVATIVE_SUFFIX}"),
    }
}

/// File name used for a transformed file inside the derivative entry
///
/// `_deidentified` goes before the extension of the last path component.
pub fn derivative_file_name(source: &str) -> String {
    let (dir, file) = match source.rfind('/') {
        Some(idx) => source.split_at(idx + 1),
        None => ("", source),
    };
    let renamed = match file.rfind('.') {
        Some(dot) if dot > 0 => format!("{}_deidentified{}", &file[..dot], &file[dot..]),
        _ => format!("{file}_deidentified"),
    };
    format!("{dir}{renamed}")
}

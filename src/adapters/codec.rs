//! Image encoding and decoding
//!
//! Binary DICOM parsing lives outside this crate. The pipeline talks to an
//! [`ImageCodec`]; [`JsonImageCodec`] handles the JSON image documents the
//! record store holds.

use crate::domain::{ImageRecord, PhiScrubError, Result};

/// Converts stored file bytes to and from [`ImageRecord`]s
pub trait ImageCodec: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Result<ImageRecord>;

    fn encode(&self, record: &ImageRecord) -> Result<Vec<u8>>;
}

/// JSON image document codec
///
/// Tags are keyed as `GGGGEEEE`, byte values and pixel data are base64.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonImageCodec {
    pretty: bool,
}

impl JsonImageCodec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pretty() -> Self {
        Self { pretty: true }
    }
}

impl ImageCodec for JsonImageCodec {
    fn decode(&self, bytes: &[u8]) -> Result<ImageRecord> {
        serde_json::from_slice(bytes)
            .map_err(|e| PhiScrubError::Codec(format!("Failed to decode image document: {e}")))
    }

    fn encode(&self, record: &ImageRecord) -> Result<Vec<u8>> {
        let encoded = if self.pretty {
            serde_json::to_vec_pretty(record)
        } else {
            serde_json::to_vec(record)
        };
        encoded.map_err(|e| {
            PhiScrubError::Codec(format!("Failed to encode image {}: {e}", record.id))
        })
    }
}

//! Compact metadata encoding (gzip JSON, base64 text).

use base64::{engine::general_purpose::STANDARD, Engine};
use flate2::{read::GzDecoder, write::GzEncoder, Compression};
use serde_json::{Map, Value};
use std::io::{Read, Write};

use crate::error::{Error, Result};

/// Compresses metadata for storage. Empty metadata is stored as `None`.
pub fn compress(metadata: &Map<String, Value>) -> Result<Option<String>> {
    if metadata.is_empty() {
        return Ok(None);
    }

    let json = serde_json::to_vec(metadata)?;
    let mut encoder = GzEncoder::new(Vec::with_capacity(json.len() / 2), Compression::default());
    encoder
        .write_all(&json)
        .map_err(|e| Error::internal(format!("metadata compression failed: {e}")))?;
    let bytes = encoder
        .finish()
        .map_err(|e| Error::internal(format!("metadata compression failed: {e}")))?;

    Ok(Some(STANDARD.encode(bytes)))
}

/// Reverses [`compress`].
pub fn decompress(encoded: &str) -> Result<Map<String, Value>> {
    let bytes = STANDARD
        .decode(encoded)
        .map_err(|e| Error::internal(format!("metadata is not base64: {e}")))?;

    let mut json = String::new();
    GzDecoder::new(bytes.as_slice())
        .read_to_string(&mut json)
        .map_err(|e| Error::internal(format!("failed to decode gzip metadata: {e}")))?;

    match serde_json::from_str(&json)? {
        Value::Object(map) => Ok(map),
        _ => Err(Error::internal("metadata is not a JSON object")),
    }
}

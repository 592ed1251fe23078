//! Synthetic record generation for the `/payload` endpoint
//!
//! The `size` parameter looks like a byte budget ("10MB") but has always been
//! interpreted as a record COUNT: the numeric prefix is the number of records
//! and the unit suffix only validates syntax. Downstream load-test tooling
//! depends on that reading, so it is kept.

use crate::{DiagError, Result};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use serde::{Serialize, Serializer};

/// Size of the filler buffer carried by every record
pub const FILLER_LEN: usize = 1024;

/// Recognized unit suffixes, checked in this order
const UNITS: [&str; 3] = ["KB", "MB", "GB"];

/// A single synthetic record
///
/// Serializes as `{"id": <int>, "data": "<base64>"}`; the base64 string form
/// matches what clients of this server have always received for the byte
/// buffer.
#[derive(Debug, Clone, Serialize)]
pub struct Record {
    /// Zero-based position in the generated batch
    pub id: usize,
    /// Fixed-size filler buffer, shared across the batch
    #[serde(serialize_with = "as_base64")]
    pub data: Bytes,
}

fn as_base64<S>(data: &Bytes, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&STANDARD.encode(data))
}

/// Generates records for a size string such as "10MB".
///
/// The suffix must be exactly `KB`, `MB` or `GB` (case-sensitive) and the
/// prefix must parse as an integer; the prefix is the record count. A
/// negative count yields an empty batch. No upper bound is enforced: a huge
/// count can exhaust memory, which is the caller's responsibility.
pub fn generate(size: &str) -> Result<Vec<Record>> {
    let suffix = UNITS
        .iter()
        .find(|unit| size.ends_with(*unit))
        .ok_or(DiagError::UnsupportedSizeUnit)?;
    let prefix = &size[..size.len() - suffix.len()];
    let total = prefix.parse::<i64>().map_err(DiagError::SizeParse)?;
    Ok(generate_n(total.max(0) as usize))
}

/// Generates exactly `total` records with ids `0..total`.
pub fn generate_n(total: usize) -> Vec<Record> {
    let data = filler();
    (0..total)
        .map(|id| Record {
            id,
            data: data.clone(),
        })
        .collect()
}

// Deterministic filler; the content carries no meaning, only its size does.
fn filler() -> Bytes {
    let mut buf = Vec::with_capacity(FILLER_LEN);
    for i in 0..FILLER_LEN {
        buf.push(b'a' + (i % 26) as u8);
    }
    Bytes::from(buf)
}

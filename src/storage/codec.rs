//! Binary point codec
//!
//! A blob is a flat run of fixed 16-byte records with no header and no
//! delimiters:
//!
//! ```text
//! +--------------------------+--------------------------+
//! | timestamp: i64 LE (ns)   | value: f64 LE (IEEE-754) |
//! +--------------------------+--------------------------+
//!   bytes 0..8                 bytes 8..16
//! ```
//!
//! All points of one blob share the metadata of the group it belongs to.

use crate::storage::error::{StorageError, StorageResult};
use crate::storage::types::{Metadata, Point};
use std::sync::Arc;

/// Size of one encoded record in bytes
pub const RECORD_SIZE: usize = 16;

/// How to treat a blob whose length is not a multiple of [`RECORD_SIZE`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlobLayout {
    /// Report a corruption error
    #[default]
    Strict,
    /// Drop the trailing partial record
    Lenient,
}

/// Decode a blob into points carrying `metadata`
///
/// # Errors
/// Returns [`StorageError::Corruption`] for a truncated blob under
/// [`BlobLayout::Strict`].
pub fn decode_points(
    bytes: &[u8],
    metadata: &Arc<Metadata>,
    layout: BlobLayout,
) -> StorageResult<Vec<Point>> {
    let remainder = bytes.len() % RECORD_SIZE;
    if remainder != 0 && layout == BlobLayout::Strict {
        return Err(StorageError::Corruption(format!(
            "blob length {} is not a multiple of {} ({} trailing bytes)",
            bytes.len(),
            RECORD_SIZE,
            remainder
        )));
    }

    let points = bytes
        .chunks_exact(RECORD_SIZE)
        .map(|record| {
            let mut ts = [0u8; 8];
            let mut val = [0u8; 8];
            ts.copy_from_slice(&record[0..8]);
            val.copy_from_slice(&record[8..16]);
            Point::new(
                i64::from_le_bytes(ts),
                f64::from_le_bytes(val),
                Arc::clone(metadata),
            )
        })
        .collect();

    Ok(points)
}

/// Encode `(timestamp_ns, value)` pairs in the blob layout
pub fn encode_points(pairs: &[(i64, f64)]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(pairs.len() * RECORD_SIZE);
    for &(timestamp, value) in pairs {
        buf.extend_from_slice(&timestamp.to_le_bytes());
        buf.extend_from_slice(&value.to_le_bytes());
    }
    buf
}

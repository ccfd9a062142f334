//! Bucket enumeration for a query window

use crate::storage::error::{StorageError, StorageResult};
use crate::storage::keys::KeySchema;
use crate::storage::types::BucketId;
use chrono::{DateTime, Utc};

/// List the buckets that can hold points in `[start, end]`
///
/// Walks a cursor from `start` in steps of one bucket window while the
/// cursor has not passed `end`, then adds the bucket of the final cursor
/// so the bucket of `end` is always covered. The result is ascending and may
/// contain consecutive duplicates and one bucket past `end`.
///
/// # Errors
/// Returns [`StorageError::InvalidTimeRange`] if `start > end`.
pub fn enumerate_buckets(
    schema: &KeySchema,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> StorageResult<Vec<BucketId>> {
    if start > end {
        return Err(StorageError::InvalidTimeRange);
    }

    let step = schema.window();
    let mut buckets = Vec::new();
    let mut cursor = start;

    while cursor <= end {
        buckets.push(schema.bucket_for(cursor));
        cursor += step;
    }
    buckets.push(schema.bucket_for(cursor));

    Ok(buckets)
}

/// Upper bound on the length of [`enumerate_buckets`] for the same window
///
/// Computed from the two end buckets without walking the window, so callers
/// can refuse oversized windows before allocating anything.
///
/// # Errors
/// Returns [`StorageError::InvalidTimeRange`] if `start > end`.
pub fn bucket_count(
    schema: &KeySchema,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> StorageResult<u64> {
    if start > end {
        return Err(StorageError::InvalidTimeRange);
    }

    let first = schema.bucket_for(start).get();
    let last = schema.bucket_for(end).get();

    last.checked_sub(first)
        .and_then(|span| span.checked_add(2))
        .and_then(|n| u64::try_from(n).ok())
        .ok_or(StorageError::InvalidTimeRange)
}

//! Key schema shared with the write path
//!
//! Keys must match what the writer produces byte for byte:
//!
//! ```text
//! index: chronodium-{schema}-{metric-{shard}}-{window}-{bucket}-raw
//! blob:  chronodium-{schema}-{metric-{shard}}-{window}-{bucket}-raw-{hash}
//! ```
//!
//! The braces around `metric-{shard}` are literal and act as a Redis Cluster
//! hash tag, so every key of one shard lands on the same slot.

use crate::storage::error::{StorageError, StorageResult};
use crate::storage::types::{BucketId, MetadataHash};
use chrono::{DateTime, Duration, Utc};

/// Schema version written by the current writer
pub const DEFAULT_SCHEMA_VERSION: u32 = 1;

/// Default bucket width in seconds
pub const DEFAULT_BUCKET_WINDOW_SECS: i64 = 3600;

/// Bucket width and schema version used to derive buckets and keys
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeySchema {
    pub schema_version: u32,
    /// Bucket width in seconds (always > 0)
    pub bucket_window: i64,
}

impl Default for KeySchema {
    fn default() -> Self {
        Self {
            schema_version: DEFAULT_SCHEMA_VERSION,
            bucket_window: DEFAULT_BUCKET_WINDOW_SECS,
        }
    }
}

impl KeySchema {
    /// Create a schema, rejecting a non-positive bucket window
    pub fn new(schema_version: u32, bucket_window: i64) -> StorageResult<Self> {
        if bucket_window <= 0 {
            return Err(StorageError::Config(format!(
                "bucket window must be positive, got {}",
                bucket_window
            )));
        }
        Ok(Self {
            schema_version,
            bucket_window,
        })
    }

    /// Bucket holding timestamp `t`
    pub fn bucket_for(&self, t: DateTime<Utc>) -> BucketId {
        BucketId::new(t.timestamp().div_euclid(self.bucket_window))
    }

    /// Width of one bucket
    pub fn window(&self) -> Duration {
        Duration::seconds(self.bucket_window)
    }

    /// Sorted-set key holding the metadata index of one bucket
    pub fn index_key(&self, shard_key: &str, bucket: BucketId) -> String {
        format!(
            "chronodium-{}-{{metric-{}}}-{}-{}-raw",
            self.schema_version, shard_key, self.bucket_window, bucket
        )
    }

    /// Key of the point blob for one metadata group of one bucket
    pub fn blob_key(&self, shard_key: &str, bucket: BucketId, hash: MetadataHash) -> String {
        format!("{}-{}", self.index_key(shard_key, bucket), hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_key_format() {
        let schema = KeySchema::default();
        assert_eq!(
            schema.index_key("cpu.load", BucketId::new(472_222)),
            "chronodium-1-{metric-cpu.load}-3600-472222-raw"
        );
    }

    #[test]
    fn test_blob_key_format() {
        let schema = KeySchema::new(2, 600).unwrap();
        assert_eq!(
            schema.blob_key("disk", BucketId::new(5), MetadataHash::new(-991)),
            "chronodium-2-{metric-disk}-600-5-raw--991"
        );
        assert_eq!(
            schema.blob_key("disk", BucketId::new(5), MetadataHash::new(1234)),
            "chronodium-2-{metric-disk}-600-5-raw-1234"
        );
    }

    #[test]
    fn test_bucket_for() {
        let schema = KeySchema::default();
        let t = DateTime::from_timestamp(7_199, 0).unwrap();
        assert_eq!(schema.bucket_for(t), BucketId::new(1));

        let t = DateTime::from_timestamp(7_200, 0).unwrap();
        assert_eq!(schema.bucket_for(t), BucketId::new(2));

        // Pre-epoch timestamps stay contiguous
        let t = DateTime::from_timestamp(-1, 0).unwrap();
        assert_eq!(schema.bucket_for(t), BucketId::new(-1));
    }

    #[test]
    fn test_rejects_zero_window() {
        assert!(KeySchema::new(1, 0).is_err());
        assert!(KeySchema::new(1, -60).is_err());
    }
}

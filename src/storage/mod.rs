//! Chronodium Storage Layer
//!
//! This module provides everything the read path needs below the query engine:
//!
//! - **types**: Core data structures (Point, Metadata, MetadataHash, BucketId)
//! - **keys**: Key schema and bucket derivation shared with the writer
//! - **buckets**: Bucket enumeration for a time window
//! - **codec**: Fixed-width binary point records
//! - **store**: The `Store` capability and an in-memory implementation
//! - **redis_store**: Redis implementation of `Store`
//! - **error**: Error types
//!
//! # Layout
//!
//! ```text
//! {metric-shard} bucket N
//!   ...-N-raw          ZSET  score = metadata hash, member = "<marker>-<json tags>"
//!   ...-N-raw-<hash>   STRING  16-byte records (i64 ts ns, f64 value), little endian
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use chronodium::storage::{enumerate_buckets, KeySchema, RedisStore, RedisStoreConfig, Store};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = RedisStore::connect(&RedisStoreConfig::default()).await?;
//!     let schema = KeySchema::default();
//!
//!     let end = chrono::Utc::now();
//!     let start = end - chrono::Duration::hours(6);
//!     for bucket in enumerate_buckets(&schema, start, end)? {
//!         let index = store
//!             .get_sorted_set_with_scores(&schema.index_key("cpu", bucket))
//!             .await?;
//!         println!("bucket {}: {} metadata groups", bucket, index.len());
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod buckets;
pub mod codec;
pub mod error;
pub mod keys;
pub mod redis_store;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use buckets::{bucket_count, enumerate_buckets};
pub use codec::{decode_points, encode_points, BlobLayout, RECORD_SIZE};
pub use error::{StorageError, StorageResult};
pub use keys::{KeySchema, DEFAULT_BUCKET_WINDOW_SECS, DEFAULT_SCHEMA_VERSION};
pub use redis_store::{redact_url, RedisStore, RedisStoreConfig};
pub use store::{MemoryStore, Store};
pub use types::{format_date, format_value, BucketId, Metadata, MetadataHash, Point};

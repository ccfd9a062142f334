//! Chronodium Query Engine
//!
//! Answers windowed queries over the bucketed store:
//!
//! - **Request**: Query window, shard key, tag filter, engine options
//! - **Metadata**: Resolve a bucket's metadata index against the filter
//! - **Scanner**: Fetch and decode the blobs of one bucket
//! - **Engine**: Enumerate buckets, scan, clip, sort
//! - **Time**: Window bound expressions (`now-1h`, RFC 3339, nanoseconds)
//!
//! # Semantics
//!
//! ```text
//! result = sort_by_ts({ p in scan(b) for b in buckets(start, end) | start < p.ts < end })
//! ```
//!
//! Both window bounds are exclusive. Store failures are isolated per bucket
//! and reported through [`ResultSet::warnings`] under the default
//! [`FailurePolicy::FailOpen`].
//!
//! # Example
//!
//! ```rust,ignore
//! use chronodium::query::{Query, QueryEngine, QueryOptions};
//! use chronodium::storage::{KeySchema, MemoryStore};
//! use std::sync::Arc;
//!
//! let engine = QueryEngine::new(Arc::new(MemoryStore::new()), KeySchema::default(), QueryOptions::default());
//!
//! let end = chrono::Utc::now();
//! let query = Query::new("cpu.load", end - chrono::Duration::hours(1), end)
//!     .filter_tag("host", "web-1");
//!
//! let result = engine.query(&query).await?;
//! if result.is_partial() {
//!     eprintln!("{} buckets could not be read fully", result.warnings().len());
//! }
//! ```

mod engine;
mod error;
mod metadata;
mod request;
mod result;
mod scanner;
mod time;

pub use engine::QueryEngine;
pub use error::{QueryError, QueryResult};
pub use metadata::{matches_filter, parse_member, MetadataIndexResolver, ResolvedIndex};
pub use request::{FailurePolicy, Query, QueryOptions};
pub use result::{BucketScan, ResultSet, ScanWarning, WarningKind};
pub use scanner::BucketScanner;
pub use time::parse_time_expr;

//! # Chronodium
//!
//! Read path for a bucketed time-series store kept in Redis. Points are
//! partitioned by shard key and fixed-width time bucket; each bucket holds a
//! metadata index (sorted set) and one binary blob per distinct tag set.
//!
//! ## Features
//!
//! - **Windowed queries**: exclusive `(start, end)` windows across buckets
//! - **Tag filters**: conjunctive exact-match filtering on point metadata
//! - **Failure isolation**: unreadable buckets become warnings, not errors
//! - **HTTP API**: query and health endpoints with Axum
//!
//! ## Modules
//!
//! - [`storage`]: Key schema, bucket enumeration, blob codec, store backends
//! - [`query`]: Metadata resolution, bucket scanning and the query engine
//! - [`api`]: REST API server with Axum
//! - [`config`]: TOML configuration with environment overrides
//! - [`logging`]: Tracing subscriber setup
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use chronodium::query::{Query, QueryEngine, QueryOptions};
//! use chronodium::storage::{KeySchema, RedisStore, RedisStoreConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(RedisStore::connect(&RedisStoreConfig::default()).await?);
//!     let engine = QueryEngine::new(store, KeySchema::default(), QueryOptions::default());
//!
//!     // Last six hours of one host
//!     let end = chrono::Utc::now();
//!     let query = Query::new("cpu.load", end - chrono::Duration::hours(6), end)
//!         .filter_tag("host", "web-1");
//!
//!     let result = engine.query(&query).await?;
//!     for point in result.points() {
//!         println!("{} {}", point.date(), point.value());
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod logging;
pub mod query;
pub mod storage;

// Re-export top-level types for convenience
pub use storage::{
    BucketId, KeySchema, MemoryStore, Metadata, MetadataHash, Point, RedisStore,
    RedisStoreConfig, StorageError, StorageResult, Store,
};

pub use query::{
    FailurePolicy, Query, QueryEngine, QueryError, QueryOptions, QueryResult, ResultSet,
    ScanWarning, WarningKind,
};

pub use api::{build_router, serve, ApiError, AppState};

pub use config::{ApiConfig, Config, ConfigError, LoggingConfig};

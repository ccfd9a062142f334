//! Data Transfer Objects
//!
//! Request and response types for the API endpoints.
//! These types are serialized/deserialized to/from JSON.

use crate::query::ScanWarning;
use crate::storage::Point;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ============================================
// QUERY DTOs
// ============================================

/// Query request
#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    /// Shard to read, usually the metric name
    pub shard_key: String,
    /// Exclusive window start
    pub start: TimeValue,
    /// Exclusive window end
    pub end: TimeValue,
    /// Exact-match tag filter
    #[serde(default)]
    pub filter: HashMap<String, String>,
}

/// A point in time as sent by clients
///
/// Integers are nanoseconds since the epoch; strings are RFC 3339, a
/// nanosecond count, `now` or `now-<n><s|m|h|d|w>`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum TimeValue {
    Nanos(i64),
    Text(String),
}

/// Query response
#[derive(Debug, Serialize)]
pub struct QueryResponse {
    /// Points ascending by timestamp, flattened with their metadata
    pub points: Vec<Point>,
    pub meta: QueryMeta,
}

/// Query metadata
#[derive(Debug, Serialize)]
pub struct QueryMeta {
    /// Number of points returned
    pub point_count: usize,
    /// True when failed reads may have dropped points
    pub partial: bool,
    /// Problems met while scanning, empty on a clean read
    pub warnings: Vec<ScanWarning>,
    /// Query execution time in milliseconds
    pub execution_time_ms: u64,
}

// ============================================
// METRIC DTOs
// ============================================

/// Metric list response
#[derive(Debug, Serialize)]
pub struct MetricListResponse {
    pub metrics: Vec<String>,
}

// ============================================
// HEALTH DTOs
// ============================================

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Overall status: "healthy" or "unhealthy"
    pub status: String,
    /// Store status: "ok" or "error"
    pub store: String,
    /// Address the server listens on
    pub listen: String,
    /// Server uptime in seconds
    pub uptime_seconds: u64,
    /// Chronodium version
    pub version: String,
}

//! Query input and engine options

use crate::query::error::{QueryError, QueryResult};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

/// A windowed query over one shard
///
/// The engine returns points strictly between `start` and `end` whose
/// metadata matches every entry of `filter`.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Logical partition, usually the metric name
    pub shard_key: String,
    /// Exact-match tag filter, all entries must match
    pub filter: HashMap<String, String>,
}

impl Query {
    pub fn new(shard_key: impl Into<String>, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start,
            end,
            shard_key: shard_key.into(),
            filter: HashMap::new(),
        }
    }

    /// Builder: require tag `key` to equal `value`
    pub fn filter_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.filter.insert(key.into(), value.into());
        self
    }

    /// Builder: add several tag requirements
    pub fn filter(mut self, tags: HashMap<String, String>) -> Self {
        self.filter.extend(tags);
        self
    }

    /// Exclusive window bounds in nanoseconds
    pub fn bounds_nanos(&self) -> QueryResult<(i64, i64)> {
        let start = self.start.timestamp_nanos_opt().ok_or_else(|| {
            QueryError::InvalidTimeRange(format!("start {} is out of range", self.start))
        })?;
        let end = self.end.timestamp_nanos_opt().ok_or_else(|| {
            QueryError::InvalidTimeRange(format!("end {} is out of range", self.end))
        })?;
        Ok((start, end))
    }

    /// Check ordering and representability of the window
    pub fn validate(&self) -> QueryResult<()> {
        if self.start > self.end {
            return Err(QueryError::InvalidTimeRange(format!(
                "start {} is after end {}",
                self.start, self.end
            )));
        }
        self.bounds_nanos().map(|_| ())
    }
}

/// What to do when a store fetch or blob decode fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Log, record a warning and keep whatever the bucket produced so far
    #[default]
    FailOpen,
    /// Abort the query with the first error
    FailFast,
}

impl std::str::FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fail-open" | "open" => Ok(FailurePolicy::FailOpen),
            "fail-fast" | "fast" => Ok(FailurePolicy::FailFast),
            _ => Err(format!(
                "Invalid failure policy: {}. Use fail-open or fail-fast",
                s
            )),
        }
    }
}

/// Tuning knobs for [`crate::query::QueryEngine`]
#[derive(Debug, Clone)]
pub struct QueryOptions {
    pub failure_policy: FailurePolicy,
    /// Maximum buckets scanned at the same time (at least 1)
    pub max_concurrent_buckets: usize,
    /// Widest window accepted, in buckets
    pub max_buckets: u64,
    /// Reject blobs whose length is not a whole number of records
    pub strict_blob_length: bool,
    /// Deadline for a whole query, `None` for no deadline
    pub timeout: Option<Duration>,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            failure_policy: FailurePolicy::FailOpen,
            max_concurrent_buckets: 8,
            max_buckets: 10_000,
            strict_blob_length: true,
            timeout: Some(Duration::from_secs(30)),
        }
    }
}

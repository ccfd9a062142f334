//! Core data types for the Chronodium read path
//!
//! This module defines the fundamental types used throughout the storage layer:
//! - `Point`: A single decoded measurement with its shared metadata
//! - `Metadata`: The tag set attached to every point of one blob
//! - `MetadataHash`: Opaque identifier of a metadata group inside a bucket
//! - `BucketId`: Index of a fixed-width time partition

use chrono::{DateTime, SecondsFormat, Utc};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

/// Tag set shared by all points of one blob
pub type Metadata = HashMap<String, String>;

/// Opaque identifier of a metadata group within one bucket
///
/// Assigned by the write path. The read path never derives or does
/// arithmetic on it; it is only compared, ordered and rendered into keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MetadataHash(i64);

impl MetadataHash {
    /// Wrap a raw identifier
    pub fn new(raw: i64) -> Self {
        Self(raw)
    }

    /// Build from a sorted-set score (fractional part is dropped)
    pub fn from_score(score: f64) -> Self {
        Self(score as i64)
    }

    /// Sorted-set score carrying this hash
    pub fn to_score(self) -> f64 {
        self.0 as f64
    }
}

impl fmt::Display for MetadataHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Index of a fixed-width time bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BucketId(i64);

impl BucketId {
    pub fn new(raw: i64) -> Self {
        Self(raw)
    }

    pub fn get(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for BucketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single decoded time-series point
///
/// Immutable once built. Points decoded from the same blob hold the same
/// `Arc<Metadata>`.
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    /// Nanoseconds since the Unix epoch
    timestamp: i64,
    value: f64,
    metadata: Arc<Metadata>,
}

impl Point {
    pub fn new(timestamp: i64, value: f64, metadata: Arc<Metadata>) -> Self {
        Self {
            timestamp,
            value,
            metadata,
        }
    }

    /// Nanoseconds since the Unix epoch
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Shared handle to the metadata set
    pub fn metadata_arc(&self) -> &Arc<Metadata> {
        &self.metadata
    }

    /// Timestamp as a UTC date
    pub fn date(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_nanos(self.timestamp)
    }
}

/// Serializes as a flat object: metadata keys plus `_date` and `_value`.
///
/// Keys come out sorted. `_date` and `_value` win over metadata keys of the
/// same name.
impl Serialize for Point {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut fields: BTreeMap<&str, String> = self
            .metadata
            .iter()
            .map(|(k, v)| (k.as_str(), v.clone()))
            .collect();
        fields.insert("_date", format_date(self.timestamp));
        fields.insert("_value", format_value(self.value));

        let mut map = serializer.serialize_map(Some(fields.len()))?;
        for (k, v) in &fields {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// RFC 3339 in UTC with trailing fractional zeros trimmed
pub fn format_date(timestamp: i64) -> String {
    let full = DateTime::from_timestamp_nanos(timestamp).to_rfc3339_opts(SecondsFormat::Nanos, true);
    let Some(body) = full.strip_suffix('Z') else {
        return full;
    };
    match body.split_once('.') {
        Some((secs, frac)) => {
            let frac = frac.trim_end_matches('0');
            if frac.is_empty() {
                format!("{}Z", secs)
            } else {
                format!("{}.{}Z", secs, frac)
            }
        }
        None => full,
    }
}

/// Shortest decimal that round-trips, never in exponent form
pub fn format_value(value: f64) -> String {
    if value == f64::INFINITY {
        "+Inf".to_string()
    } else if value == f64::NEG_INFINITY {
        "-Inf".to_string()
    } else {
        value.to_string()
    }
}

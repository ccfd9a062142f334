//! Query results and the warnings side channel

use crate::storage::{BucketId, Point};
use serde::Serialize;

/// Why part of a bucket could not be read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// The bucket's metadata index could not be fetched
    IndexFetch,
    /// A point blob could not be fetched
    BlobFetch,
    /// A point blob had a truncated record
    CorruptBlob,
    /// A metadata index entry was not valid JSON; the entry was skipped
    MetadataDecode,
}

impl WarningKind {
    /// Whether points may be missing because of this warning
    pub fn loses_data(&self) -> bool {
        !matches!(self, WarningKind::MetadataDecode)
    }
}

/// A non-fatal problem met while scanning one bucket
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanWarning {
    pub kind: WarningKind,
    pub bucket: i64,
    /// Store key involved
    pub key: String,
    pub message: String,
}

impl ScanWarning {
    pub fn new(
        kind: WarningKind,
        bucket: BucketId,
        key: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            bucket: bucket.get(),
            key: key.into(),
            message: message.into(),
        }
    }
}

/// Output of scanning a single bucket
#[derive(Debug, Clone, Default)]
pub struct BucketScan {
    pub points: Vec<Point>,
    pub warnings: Vec<ScanWarning>,
}

/// Points returned by a query, ascending by timestamp
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    points: Vec<Point>,
    warnings: Vec<ScanWarning>,
    buckets_scanned: usize,
}

impl ResultSet {
    pub(crate) fn new(points: Vec<Point>, warnings: Vec<ScanWarning>, buckets_scanned: usize) -> Self {
        Self {
            points,
            warnings,
            buckets_scanned,
        }
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn into_points(self) -> Vec<Point> {
        self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// True when store or blob failures may have left points out
    ///
    /// Distinguishes "empty because there is no data" from "empty because
    /// reads failed".
    pub fn is_partial(&self) -> bool {
        self.warnings.iter().any(|w| w.kind.loses_data())
    }

    pub fn warnings(&self) -> &[ScanWarning] {
        &self.warnings
    }

    /// Number of distinct buckets the query looked at
    pub fn buckets_scanned(&self) -> usize {
        self.buckets_scanned
    }

    /// Convert to `(timestamp, value)` pairs
    pub fn to_time_series(&self) -> Vec<(i64, f64)> {
        self.points
            .iter()
            .map(|p| (p.timestamp(), p.value()))
            .collect()
    }
}

impl IntoIterator for ResultSet {
    type Item = Point;
    type IntoIter = std::vec::IntoIter<Point>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_flag() {
        let decode_only = ResultSet::new(
            Vec::new(),
            vec![ScanWarning::new(
                WarningKind::MetadataDecode,
                BucketId::new(1),
                "idx",
                "bad json",
            )],
            1,
        );
        assert!(!decode_only.is_partial());

        let fetch_failed = ResultSet::new(
            Vec::new(),
            vec![ScanWarning::new(
                WarningKind::BlobFetch,
                BucketId::new(1),
                "blob",
                "timeout",
            )],
            1,
        );
        assert!(fetch_failed.is_partial());
        assert!(fetch_failed.is_empty());
    }

    #[test]
    fn test_warning_serialization() {
        let warning = ScanWarning::new(WarningKind::IndexFetch, BucketId::new(3), "k", "down");
        let json = serde_json::to_value(&warning).unwrap();

        assert_eq!(json["kind"], "index_fetch");
        assert_eq!(json["bucket"], 3);
    }
}

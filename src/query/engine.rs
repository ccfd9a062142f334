//! Query Engine
//!
//! Executes a windowed [`Query`] against a [`Store`]:
//!
//! ```text
//! Query → Validate → Enumerate buckets → Scan (concurrent) → Clip → Sort → ResultSet
//! ```
//!
//! Buckets are scanned concurrently up to `max_concurrent_buckets`, and the
//! results are gathered in bucket order before clipping and sorting. A
//! failing bucket only loses its own points under the fail-open policy.

use crate::query::error::{QueryError, QueryResult};
use crate::query::request::{FailurePolicy, Query, QueryOptions};
use crate::query::result::{BucketScan, ResultSet};
use crate::query::scanner::BucketScanner;
use crate::storage::{
    bucket_count, enumerate_buckets, BlobLayout, KeySchema, StorageError, Store,
};
use futures_util::stream::{self, StreamExt, TryStreamExt};
use std::sync::Arc;
use std::time::Instant;

/// Read path entry point
pub struct QueryEngine {
    scanner: BucketScanner,
    schema: KeySchema,
    options: QueryOptions,
}

impl QueryEngine {
    /// Create an engine reading from `store`
    pub fn new(store: Arc<dyn Store>, schema: KeySchema, options: QueryOptions) -> Self {
        let layout = if options.strict_blob_length {
            BlobLayout::Strict
        } else {
            BlobLayout::Lenient
        };
        Self {
            scanner: BucketScanner::new(store, schema, layout, options.failure_policy),
            schema,
            options,
        }
    }

    pub fn schema(&self) -> &KeySchema {
        &self.schema
    }

    pub fn options(&self) -> &QueryOptions {
        &self.options
    }

    /// Run `query` and return its points in ascending timestamp order
    ///
    /// Only points with `start < timestamp < end` are returned. Points with
    /// equal timestamps keep scan order.
    ///
    /// # Errors
    /// - [`QueryError::InvalidTimeRange`] if `start > end` or the window spans
    ///   more than `max_buckets` buckets; nothing is scanned.
    /// - [`QueryError::Timeout`] if the configured deadline passes; in-flight
    ///   scans are dropped and no partial output is returned.
    /// - [`QueryError::Storage`] for the first store or blob error under
    ///   [`FailurePolicy::FailFast`].
    pub async fn query(&self, query: &Query) -> QueryResult<ResultSet> {
        query.validate()?;
        self.check_width(query)?;

        match self.options.timeout {
            Some(deadline) => tokio::time::timeout(deadline, self.execute(query))
                .await
                .map_err(|_| QueryError::Timeout(deadline.as_millis() as u64))?,
            None => self.execute(query).await,
        }
    }

    /// Refuse windows wider than `max_buckets` before anything is allocated
    fn check_width(&self, query: &Query) -> QueryResult<()> {
        let count =
            bucket_count(&self.schema, query.start, query.end).map_err(range_error)?;
        if count > self.options.max_buckets {
            return Err(QueryError::InvalidTimeRange(format!(
                "window spans up to {} buckets, limit is {}",
                count, self.options.max_buckets
            )));
        }
        Ok(())
    }

    #[tracing::instrument(
        name = "query",
        skip(self, query),
        fields(shard = %query.shard_key, policy = ?self.options.failure_policy)
    )]
    async fn execute(&self, query: &Query) -> QueryResult<ResultSet> {
        let started = Instant::now();
        let (start_ns, end_ns) = query.bounds_nanos()?;

        let mut buckets =
            enumerate_buckets(&self.schema, query.start, query.end).map_err(range_error)?;
        buckets.dedup();

        let scans: Vec<BucketScan> = stream::iter(buckets.iter().copied())
            .map(|bucket| {
                self.scanner
                    .scan_bucket(&query.shard_key, bucket, &query.filter)
            })
            .buffered(self.options.max_concurrent_buckets.max(1))
            .try_collect()
            .await?;

        let mut points = Vec::new();
        let mut warnings = Vec::new();
        for scan in scans {
            points.extend(
                scan.points
                    .into_iter()
                    .filter(|p| p.timestamp() > start_ns && p.timestamp() < end_ns),
            );
            warnings.extend(scan.warnings);
        }
        points.sort_by_key(|p| p.timestamp());

        let result = ResultSet::new(points, warnings, buckets.len());
        tracing::debug!(
            buckets = result.buckets_scanned(),
            points = result.len(),
            partial = result.is_partial(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Query finished"
        );
        Ok(result)
    }

    /// Names of the metrics known to the store
    ///
    /// The writer keeps no metric-name index, so there is nothing to
    /// enumerate and this always returns an empty list.
    pub async fn metric_names(&self) -> QueryResult<Vec<String>> {
        Ok(Vec::new())
    }
}

fn range_error(err: StorageError) -> QueryError {
    match err {
        StorageError::InvalidTimeRange => {
            QueryError::InvalidTimeRange("start is after end".to_string())
        }
        other => QueryError::Storage(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::result::WarningKind;
    use crate::storage::{encode_points, BucketId, MemoryStore, Metadata, MetadataHash};
    use chrono::{DateTime, Utc};
    use std::collections::HashMap;
    use std::time::Duration;

    const SHARD: &str = "cpu";
    const SEC: i64 = 1_000_000_000;

    fn at_nanos(nanos: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_nanos(nanos)
    }

    fn tags(pairs: &[(&str, &str)]) -> Metadata {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    /// Write points the way the writer would: into the bucket of their timestamp
    async fn write(
        store: &MemoryStore,
        schema: &KeySchema,
        hash: i64,
        metadata: &Metadata,
        points: &[(i64, f64)],
    ) {
        let mut by_bucket: HashMap<BucketId, Vec<(i64, f64)>> = HashMap::new();
        for &(ts, value) in points {
            let bucket = schema.bucket_for(at_nanos(ts));
            by_bucket.entry(bucket).or_default().push((ts, value));
        }
        for (bucket, pairs) in by_bucket {
            store
                .put_group(
                    schema,
                    SHARD,
                    bucket,
                    MetadataHash::new(hash),
                    metadata,
                    encode_points(&pairs),
                )
                .await
                .unwrap();
        }
    }

    fn engine(store: Arc<MemoryStore>, schema: KeySchema) -> QueryEngine {
        QueryEngine::new(store, schema, QueryOptions::default())
    }

    #[tokio::test]
    async fn test_scenario_exclusive_window() {
        let store = Arc::new(MemoryStore::new());
        let schema = KeySchema::default();
        write(&store, &schema, 1, &tags(&[("host", "a")]), &[(1000, 1.5), (2000, 2.5)]).await;

        let engine = engine(store, schema);
        let result = engine
            .query(&Query::new(SHARD, at_nanos(500), at_nanos(1999)))
            .await
            .unwrap();

        assert_eq!(result.to_time_series(), vec![(1000, 1.5)]);
        assert!(!result.is_partial());
    }

    #[tokio::test]
    async fn test_boundaries_are_exclusive() {
        let store = Arc::new(MemoryStore::new());
        let schema = KeySchema::default();
        let start = 10 * SEC;
        let end = 20 * SEC;
        write(
            &store,
            &schema,
            1,
            &tags(&[("host", "a")]),
            &[(start, 1.0), (start + 1, 2.0), (end - 1, 3.0), (end, 4.0)],
        )
        .await;

        let engine = engine(store, schema);
        let result = engine
            .query(&Query::new(SHARD, at_nanos(start), at_nanos(end)))
            .await
            .unwrap();

        assert_eq!(result.to_time_series(), vec![(start + 1, 2.0), (end - 1, 3.0)]);
    }

    #[tokio::test]
    async fn test_merges_buckets_in_order() {
        let store = Arc::new(MemoryStore::new());
        let schema = KeySchema::new(1, 60).unwrap();
        // Unordered within blobs and interleaved across groups and buckets
        write(
            &store,
            &schema,
            1,
            &tags(&[("host", "a")]),
            &[(185 * SEC, 5.0), (5 * SEC, 1.0), (70 * SEC, 3.0)],
        )
        .await;
        write(
            &store,
            &schema,
            2,
            &tags(&[("host", "b")]),
            &[(130 * SEC, 4.0), (30 * SEC, 2.0)],
        )
        .await;

        let engine = engine(store, schema);
        let result = engine
            .query(&Query::new(SHARD, at_nanos(0), at_nanos(200 * SEC)))
            .await
            .unwrap();

        let values: Vec<f64> = result.points().iter().map(|p| p.value()).collect();
        assert_eq!(values, vec![1.0, 2.0, 3.0, 4.0, 5.0]);
        assert!(result
            .points()
            .windows(2)
            .all(|w| w[0].timestamp() <= w[1].timestamp()));
        assert_eq!(result.points()[1].metadata()["host"], "b");
    }

    #[tokio::test]
    async fn test_filter_across_buckets() {
        let store = Arc::new(MemoryStore::new());
        let schema = KeySchema::new(1, 60).unwrap();
        write(
            &store,
            &schema,
            1,
            &tags(&[("host", "a"), ("dc", "ams")]),
            &[(10 * SEC, 1.0), (100 * SEC, 2.0)],
        )
        .await;
        write(
            &store,
            &schema,
            2,
            &tags(&[("host", "b"), ("dc", "ams")]),
            &[(20 * SEC, 3.0), (110 * SEC, 4.0)],
        )
        .await;

        let engine = engine(store, schema);
        let window = Query::new(SHARD, at_nanos(0), at_nanos(180 * SEC));

        let all_ams = engine
            .query(&window.clone().filter_tag("dc", "ams"))
            .await
            .unwrap();
        assert_eq!(all_ams.len(), 4);

        let host_b = engine
            .query(&window.clone().filter_tag("dc", "ams").filter_tag("host", "b"))
            .await
            .unwrap();
        assert_eq!(host_b.to_time_series(), vec![(20 * SEC, 3.0), (110 * SEC, 4.0)]);

        let nothing = engine
            .query(&window.filter_tag("dc", "fra"))
            .await
            .unwrap();
        assert!(nothing.is_empty());
        assert!(!nothing.is_partial());
    }

    #[tokio::test]
    async fn test_ties_keep_scan_order() {
        let store = Arc::new(MemoryStore::new());
        let schema = KeySchema::default();
        write(&store, &schema, 7, &tags(&[("host", "a")]), &[(SEC, 1.0)]).await;
        write(&store, &schema, 3, &tags(&[("host", "b")]), &[(SEC, 2.0)]).await;

        let engine = engine(store, schema);
        let result = engine
            .query(&Query::new(SHARD, at_nanos(0), at_nanos(2 * SEC)))
            .await
            .unwrap();

        // Hash 3 is scanned before hash 7
        assert_eq!(result.to_time_series(), vec![(SEC, 2.0), (SEC, 1.0)]);
    }

    #[tokio::test]
    async fn test_invalid_range_scans_nothing() {
        let store = Arc::new(MemoryStore::new());
        let schema = KeySchema::default();
        // Any read would fail loudly
        for bucket in 0..4 {
            store.fail_key(schema.index_key(SHARD, BucketId::new(bucket))).await;
        }

        let engine = QueryEngine::new(
            store,
            schema,
            QueryOptions {
                failure_policy: FailurePolicy::FailFast,
                ..Default::default()
            },
        );
        let result = engine
            .query(&Query::new(SHARD, at_nanos(2 * SEC), at_nanos(SEC)))
            .await;

        assert!(matches!(result, Err(QueryError::InvalidTimeRange(_))));
    }

    #[tokio::test]
    async fn test_partial_failure_keeps_other_buckets() {
        let store = Arc::new(MemoryStore::new());
        let schema = KeySchema::new(1, 60).unwrap();
        write(
            &store,
            &schema,
            1,
            &tags(&[("host", "a")]),
            &[(10 * SEC, 1.0), (70 * SEC, 2.0), (130 * SEC, 3.0)],
        )
        .await;
        store
            .fail_key(schema.blob_key(SHARD, BucketId::new(1), MetadataHash::new(1)))
            .await;

        let engine = engine(Arc::clone(&store), schema);
        let window = Query::new(SHARD, at_nanos(0), at_nanos(170 * SEC));
        let result = engine.query(&window).await.unwrap();

        assert_eq!(result.to_time_series(), vec![(10 * SEC, 1.0), (130 * SEC, 3.0)]);
        assert!(result.is_partial());
        assert_eq!(result.warnings().len(), 1);
        assert_eq!(result.warnings()[0].kind, WarningKind::BlobFetch);
        assert_eq!(result.warnings()[0].bucket, 1);

        let strict = QueryEngine::new(
            store,
            schema,
            QueryOptions {
                failure_policy: FailurePolicy::FailFast,
                ..Default::default()
            },
        );
        assert!(matches!(
            strict.query(&window).await,
            Err(QueryError::Storage(_))
        ));
    }

    #[tokio::test]
    async fn test_sequential_scans_match_concurrent() {
        let store = Arc::new(MemoryStore::new());
        let schema = KeySchema::new(1, 10).unwrap();
        let points: Vec<(i64, f64)> = (0..50).map(|i| ((i * 7 % 97) * SEC, i as f64)).collect();
        write(&store, &schema, 1, &tags(&[("host", "a")]), &points).await;

        let window = Query::new(SHARD, at_nanos(0), at_nanos(100 * SEC));
        let concurrent = engine(Arc::clone(&store), schema).query(&window).await.unwrap();
        let sequential = QueryEngine::new(
            store,
            schema,
            QueryOptions {
                max_concurrent_buckets: 1,
                ..Default::default()
            },
        )
        .query(&window)
        .await
        .unwrap();

        assert_eq!(concurrent.to_time_series(), sequential.to_time_series());
        assert_eq!(concurrent.len(), 49); // timestamp 0 sits on the start boundary
    }

    /// Store whose index reads never finish in time
    struct StalledStore;

    #[async_trait::async_trait]
    impl Store for StalledStore {
        async fn get_sorted_set_with_scores(
            &self,
            _key: &str,
        ) -> crate::storage::StorageResult<Vec<(String, f64)>> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(Vec::new())
        }

        async fn get_bytes(&self, key: &str) -> crate::storage::StorageResult<Vec<u8>> {
            Err(StorageError::KeyNotFound(key.to_string()))
        }
    }

    #[tokio::test]
    async fn test_deadline() {
        let engine = QueryEngine::new(
            Arc::new(StalledStore),
            KeySchema::default(),
            QueryOptions {
                timeout: Some(Duration::from_millis(50)),
                ..Default::default()
            },
        );

        let result = engine
            .query(&Query::new(SHARD, at_nanos(0), at_nanos(3 * 3600 * SEC)))
            .await;

        assert!(matches!(result, Err(QueryError::Timeout(50))));
    }

    #[tokio::test]
    async fn test_rejects_windows_over_bucket_limit() {
        let store = Arc::new(MemoryStore::new());
        let schema = KeySchema::default();
        write(&store, &schema, 1, &tags(&[("host", "a")]), &[(SEC, 1.0)]).await;

        let engine = QueryEngine::new(
            store,
            schema,
            QueryOptions {
                max_buckets: 3,
                ..Default::default()
            },
        );

        // Buckets 0 and 1 plus the trailing one: at the limit
        let result = engine
            .query(&Query::new(SHARD, at_nanos(0), at_nanos(3600 * SEC)))
            .await
            .unwrap();
        assert_eq!(result.len(), 1);

        let result = engine
            .query(&Query::new(SHARD, at_nanos(0), at_nanos(7200 * SEC)))
            .await;
        assert!(matches!(result, Err(QueryError::InvalidTimeRange(_))));
    }

    #[tokio::test]
    async fn test_full_range_window_is_refused() {
        let engine = engine(Arc::new(MemoryStore::new()), KeySchema::new(1, 60).unwrap());

        let started = Instant::now();
        let result = engine
            .query(&Query::new(SHARD, at_nanos(i64::MIN), at_nanos(i64::MAX)))
            .await;

        assert!(matches!(result, Err(QueryError::InvalidTimeRange(_))));
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_metric_names_stub() {
        let engine = engine(Arc::new(MemoryStore::new()), KeySchema::default());
        assert!(engine.metric_names().await.unwrap().is_empty());
    }
}

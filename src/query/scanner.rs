//! Bucket scanning
//!
//! Resolves the matching metadata groups of one bucket, fetches each
//! group's blob and decodes it. Blobs are fetched one after another in hash
//! order; on the first failed fetch or corrupt blob the scan of this bucket
//! stops and keeps what it already decoded (fail-open) or returns the error
//! (fail-fast).

use crate::query::error::QueryResult;
use crate::query::metadata::MetadataIndexResolver;
use crate::query::request::FailurePolicy;
use crate::query::result::{BucketScan, ScanWarning, WarningKind};
use crate::storage::{decode_points, BlobLayout, BucketId, KeySchema, StorageError, Store};
use std::collections::HashMap;
use std::sync::Arc;

/// Scans single buckets of a shard
pub struct BucketScanner {
    store: Arc<dyn Store>,
    resolver: MetadataIndexResolver,
    schema: KeySchema,
    layout: BlobLayout,
    policy: FailurePolicy,
}

impl BucketScanner {
    pub fn new(
        store: Arc<dyn Store>,
        schema: KeySchema,
        layout: BlobLayout,
        policy: FailurePolicy,
    ) -> Self {
        Self {
            resolver: MetadataIndexResolver::new(Arc::clone(&store), schema),
            store,
            schema,
            layout,
            policy,
        }
    }

    /// Decoded points of every group in `bucket` matching `filter`
    ///
    /// Points are in hash order, then blob order. Under
    /// [`FailurePolicy::FailFast`] the first store or blob error is returned.
    pub async fn scan_bucket(
        &self,
        shard_key: &str,
        bucket: BucketId,
        filter: &HashMap<String, String>,
    ) -> QueryResult<BucketScan> {
        let mut scan = BucketScan::default();

        let resolved = match self
            .resolver
            .resolve_matching_hashes(shard_key, bucket, filter)
            .await
        {
            Ok(resolved) => resolved,
            Err(e) => {
                let key = self.schema.index_key(shard_key, bucket);
                self.fail(&mut scan, WarningKind::IndexFetch, bucket, key, e)?;
                return Ok(scan);
            }
        };
        scan.warnings.extend(resolved.warnings);

        for (hash, metadata) in &resolved.groups {
            let key = self.schema.blob_key(shard_key, bucket, *hash);

            let bytes = match self.store.get_bytes(&key).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    self.fail(&mut scan, WarningKind::BlobFetch, bucket, key, e)?;
                    return Ok(scan);
                }
            };

            match decode_points(&bytes, metadata, self.layout) {
                Ok(points) => scan.points.extend(points),
                Err(e) => {
                    self.fail(&mut scan, WarningKind::CorruptBlob, bucket, key, e)?;
                    return Ok(scan);
                }
            }
        }

        Ok(scan)
    }

    /// Record a failure as a warning, or return it under fail-fast
    fn fail(
        &self,
        scan: &mut BucketScan,
        kind: WarningKind,
        bucket: BucketId,
        key: String,
        err: StorageError,
    ) -> QueryResult<()> {
        if self.policy == FailurePolicy::FailFast {
            return Err(err.into());
        }

        tracing::warn!(
            bucket = %bucket,
            key = %key,
            kept_points = scan.points.len(),
            "Abandoning bucket scan: {}",
            err
        );
        scan.warnings
            .push(ScanWarning::new(kind, bucket, key, err.to_string()));
        Ok(())
    }
}

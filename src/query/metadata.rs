//! Metadata index resolution
//!
//! Each bucket keeps a sorted set whose score is the metadata hash of a
//! group and whose member is `<marker>-<json tags>`. Resolving a bucket
//! means reading that set, decoding the tags and keeping the groups whose
//! tags satisfy the query filter.

use crate::query::result::{ScanWarning, WarningKind};
use crate::storage::{BucketId, KeySchema, Metadata, MetadataHash, StorageResult, Store};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Matching groups of one bucket, ordered by hash
#[derive(Debug, Default)]
pub struct ResolvedIndex {
    pub groups: BTreeMap<MetadataHash, Arc<Metadata>>,
    /// Index entries that were skipped
    pub warnings: Vec<ScanWarning>,
}

/// Reads a bucket's metadata index and applies a tag filter
pub struct MetadataIndexResolver {
    store: Arc<dyn Store>,
    schema: KeySchema,
}

impl MetadataIndexResolver {
    pub fn new(store: Arc<dyn Store>, schema: KeySchema) -> Self {
        Self { store, schema }
    }

    /// Groups of `bucket` whose metadata matches `filter`
    ///
    /// Entries whose member does not decode are skipped and reported in
    /// [`ResolvedIndex::warnings`].
    ///
    /// # Errors
    /// Propagates the store error if the index itself cannot be fetched.
    pub async fn resolve_matching_hashes(
        &self,
        shard_key: &str,
        bucket: BucketId,
        filter: &HashMap<String, String>,
    ) -> StorageResult<ResolvedIndex> {
        let key = self.schema.index_key(shard_key, bucket);
        let entries = self.store.get_sorted_set_with_scores(&key).await?;

        let mut resolved = ResolvedIndex::default();
        for (member, score) in entries {
            let metadata = match parse_member(&member) {
                Ok(metadata) => metadata,
                Err(e) => {
                    tracing::warn!("Skipping metadata entry in {}: {}", key, e);
                    resolved.warnings.push(ScanWarning::new(
                        WarningKind::MetadataDecode,
                        bucket,
                        key.clone(),
                        e.to_string(),
                    ));
                    continue;
                }
            };

            if matches_filter(&metadata, filter) {
                resolved
                    .groups
                    .insert(MetadataHash::from_score(score), Arc::new(metadata));
            }
        }

        tracing::debug!(
            "Bucket {} of {}: {} matching groups",
            bucket,
            shard_key,
            resolved.groups.len()
        );
        Ok(resolved)
    }
}

/// Decode the tags carried by an index member
///
/// Everything up to and including the first `-` is a marker; a member
/// without `-` is treated as bare JSON.
pub fn parse_member(member: &str) -> Result<Metadata, serde_json::Error> {
    let payload = member
        .split_once('-')
        .map(|(_, rest)| rest)
        .unwrap_or(member);
    serde_json::from_str(payload)
}

/// True if every filter entry is present in `metadata` with an equal value
pub fn matches_filter(metadata: &Metadata, filter: &HashMap<String, String>) -> bool {
    filter
        .iter()
        .all(|(key, value)| metadata.get(key) == Some(value))
}

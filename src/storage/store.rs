//! Store capability consumed by the read path
//!
//! The read path needs only two primitives from the backing store: a
//! sorted-set range with scores (the per-bucket metadata index) and a plain
//! byte fetch (the point blobs). [`MemoryStore`] implements them in process
//! and is used by tests, benches and local demos; [`crate::storage::RedisStore`]
//! talks to a real Redis server.

use crate::storage::error::{StorageError, StorageResult};
use crate::storage::keys::KeySchema;
use crate::storage::types::{BucketId, Metadata, MetadataHash};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;

/// Backing store used by the query engine
///
/// Implementations must be safe to share between concurrent queries.
#[async_trait]
pub trait Store: Send + Sync {
    /// Every member of the sorted set at `key` with its score, lowest score first
    ///
    /// A missing key yields an empty list.
    async fn get_sorted_set_with_scores(&self, key: &str) -> StorageResult<Vec<(String, f64)>>;

    /// Raw bytes stored at `key`
    ///
    /// A missing key is [`StorageError::KeyNotFound`].
    async fn get_bytes(&self, key: &str) -> StorageResult<Vec<u8>>;

    /// Check that the store is reachable
    async fn ping(&self) -> StorageResult<()> {
        Ok(())
    }
}

#[derive(Debug, Clone)]
enum Entry {
    SortedSet(Vec<(String, f64)>),
    Bytes(Vec<u8>),
}

/// In-process store with the same semantics as the Redis adapter
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Entry>>,
    failing: RwLock<HashSet<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `member` with `score` to the sorted set at `key`
    ///
    /// Re-adding an existing member updates its score, like `ZADD`.
    pub async fn zadd(&self, key: impl Into<String>, member: impl Into<String>, score: f64) {
        let member = member.into();
        let mut entries = self.entries.write().await;
        let entry = entries
            .entry(key.into())
            .or_insert_with(|| Entry::SortedSet(Vec::new()));

        if let Entry::Bytes(_) = entry {
            *entry = Entry::SortedSet(Vec::new());
        }
        if let Entry::SortedSet(members) = entry {
            members.retain(|(m, _)| m != &member);
            members.push((member, score));
            members.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
        }
    }

    /// Store raw bytes at `key`, replacing any previous value
    pub async fn set_bytes(&self, key: impl Into<String>, bytes: Vec<u8>) {
        self.entries
            .write()
            .await
            .insert(key.into(), Entry::Bytes(bytes));
    }

    /// Make every read of `key` fail with a store error
    pub async fn fail_key(&self, key: impl Into<String>) {
        self.failing.write().await.insert(key.into());
    }

    /// Write one metadata group the way the writer lays it out
    ///
    /// Adds `"raw-{json}"` to the bucket's index with the hash as score and
    /// stores `blob` under the group's blob key.
    pub async fn put_group(
        &self,
        schema: &KeySchema,
        shard_key: &str,
        bucket: BucketId,
        hash: MetadataHash,
        metadata: &Metadata,
        blob: Vec<u8>,
    ) -> StorageResult<()> {
        let member = format!("raw-{}", serde_json::to_string(metadata)?);

        self.zadd(schema.index_key(shard_key, bucket), member, hash.to_score())
            .await;
        self.set_bytes(schema.blob_key(shard_key, bucket, hash), blob)
            .await;
        Ok(())
    }

    async fn check_failing(&self, key: &str) -> StorageResult<()> {
        if self.failing.read().await.contains(key) {
            return Err(StorageError::Redis(format!(
                "connection reset while reading {}",
                key
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get_sorted_set_with_scores(&self, key: &str) -> StorageResult<Vec<(String, f64)>> {
        self.check_failing(key).await?;
        match self.entries.read().await.get(key) {
            Some(Entry::SortedSet(members)) => Ok(members.clone()),
            Some(Entry::Bytes(_)) => Err(StorageError::Redis(format!(
                "WRONGTYPE {} does not hold a sorted set",
                key
            ))),
            None => Ok(Vec::new()),
        }
    }

    async fn get_bytes(&self, key: &str) -> StorageResult<Vec<u8>> {
        self.check_failing(key).await?;
        match self.entries.read().await.get(key) {
            Some(Entry::Bytes(bytes)) => Ok(bytes.clone()),
            Some(Entry::SortedSet(_)) => Err(StorageError::Redis(format!(
                "WRONGTYPE {} does not hold a string",
                key
            ))),
            None => Err(StorageError::KeyNotFound(key.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sorted_set_ordering() {
        let store = MemoryStore::new();
        store.zadd("idx", "b", 20.0).await;
        store.zadd("idx", "a", 10.0).await;
        store.zadd("idx", "c", 15.0).await;
        store.zadd("idx", "a", 30.0).await;

        let members = store.get_sorted_set_with_scores("idx").await.unwrap();
        assert_eq!(
            members,
            vec![
                ("c".to_string(), 15.0),
                ("b".to_string(), 20.0),
                ("a".to_string(), 30.0)
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_keys() {
        let store = MemoryStore::new();

        assert!(store.get_sorted_set_with_scores("nope").await.unwrap().is_empty());
        assert!(matches!(
            store.get_bytes("nope").await,
            Err(StorageError::KeyNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_wrong_type() {
        let store = MemoryStore::new();
        store.set_bytes("blob", vec![1, 2, 3]).await;

        assert!(matches!(
            store.get_sorted_set_with_scores("blob").await,
            Err(StorageError::Redis(_))
        ));
        assert_eq!(store.get_bytes("blob").await.unwrap(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_failing_key() {
        let store = MemoryStore::new();
        store.set_bytes("blob", vec![0; 16]).await;
        store.fail_key("blob").await;

        assert!(matches!(
            store.get_bytes("blob").await,
            Err(StorageError::Redis(_))
        ));
    }

    #[tokio::test]
    async fn test_put_group_layout() {
        let store = MemoryStore::new();
        let schema = KeySchema::default();
        let metadata = Metadata::from([("host".to_string(), "db-2".to_string())]);

        store
            .put_group(
                &schema,
                "mem",
                BucketId::new(9),
                MetadataHash::new(77),
                &metadata,
                vec![0; 16],
            )
            .await
            .unwrap();

        let index = store
            .get_sorted_set_with_scores("chronodium-1-{metric-mem}-3600-9-raw")
            .await
            .unwrap();
        assert_eq!(index, vec![(r#"raw-{"host":"db-2"}"#.to_string(), 77.0)]);

        let blob = store
            .get_bytes("chronodium-1-{metric-mem}-3600-9-raw-77")
            .await
            .unwrap();
        assert_eq!(blob.len(), 16);
    }
}

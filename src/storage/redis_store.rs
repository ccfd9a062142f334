//! Redis-backed [`Store`]
//!
//! Uses one multiplexed connection shared by all queries; every command is
//! bounded by the configured command timeout.

use crate::storage::error::{StorageError, StorageResult};
use crate::storage::store::Store;
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client};
use std::future::Future;
use std::time::Duration;

/// Connection settings for [`RedisStore`]
#[derive(Debug, Clone)]
pub struct RedisStoreConfig {
    /// Redis server URL (e.g., "redis://localhost:6379")
    pub url: String,
    /// Timeout for establishing the connection
    pub connection_timeout: Duration,
    /// Timeout for each command
    pub command_timeout: Duration,
}

impl Default for RedisStoreConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            connection_timeout: Duration::from_secs(5),
            command_timeout: Duration::from_secs(1),
        }
    }
}

impl RedisStoreConfig {
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }
}

/// Store backed by a Redis server
pub struct RedisStore {
    connection: MultiplexedConnection,
    command_timeout: Duration,
}

impl RedisStore {
    /// Connect to the server described by `config`
    pub async fn connect(config: &RedisStoreConfig) -> StorageResult<Self> {
        let client = Client::open(config.url.as_str())?;
        let connection = tokio::time::timeout(
            config.connection_timeout,
            client.get_multiplexed_async_connection(),
        )
        .await
        .map_err(|_| StorageError::Timeout(config.connection_timeout.as_millis() as u64))??;

        tracing::info!("Connected to Redis at {}", redact_url(&config.url));

        Ok(Self {
            connection,
            command_timeout: config.command_timeout,
        })
    }

    async fn with_timeout<T, F>(&self, fut: F) -> StorageResult<T>
    where
        F: Future<Output = redis::RedisResult<T>>,
    {
        tokio::time::timeout(self.command_timeout, fut)
            .await
            .map_err(|_| StorageError::Timeout(self.command_timeout.as_millis() as u64))?
            .map_err(StorageError::from)
    }
}

#[async_trait]
impl Store for RedisStore {
    async fn get_sorted_set_with_scores(&self, key: &str) -> StorageResult<Vec<(String, f64)>> {
        let mut conn = self.connection.clone();
        self.with_timeout(conn.zrange_withscores::<_, Vec<(String, f64)>>(key, 0, -1))
            .await
    }

    async fn get_bytes(&self, key: &str) -> StorageResult<Vec<u8>> {
        let mut conn = self.connection.clone();
        let bytes: Option<Vec<u8>> = self.with_timeout(conn.get(key)).await?;
        bytes.ok_or_else(|| StorageError::KeyNotFound(key.to_string()))
    }

    async fn ping(&self) -> StorageResult<()> {
        let mut conn = self.connection.clone();
        let reply: String = self
            .with_timeout(redis::cmd("PING").query_async::<String>(&mut conn))
            .await?;
        tracing::debug!("Redis ping: {}", reply);
        Ok(())
    }
}

/// Hide credentials in a Redis URL before it is logged
pub fn redact_url(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}://***{}", &url[..scheme_end], &url[at..])
        }
        _ => url.to_string(),
    }
}

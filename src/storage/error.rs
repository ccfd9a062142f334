//! Storage layer error types
//!
//! Defines all errors that can occur while talking to the backing store
//! or decoding what it returns.

use thiserror::Error;

/// Errors that can occur in the storage layer
#[derive(Error, Debug)]
pub enum StorageError {
    /// The Redis client reported a failure (connection, protocol, type)
    #[error("Redis error: {0}")]
    Redis(String),

    /// A store command did not complete within its deadline
    #[error("Store command timed out after {0} ms")]
    Timeout(u64),

    /// Requested key does not exist in the store
    #[error("Key not found: {0}")]
    KeyNotFound(String),

    /// Data corruption detected (truncated blob, bad record layout)
    #[error("Corrupt data: {0}")]
    Corruption(String),

    /// Serialization/deserialization failed
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid schema or store configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid time range (start after end)
    #[error("Invalid time range: start must be before or equal to end")]
    InvalidTimeRange,
}

impl From<redis::RedisError> for StorageError {
    fn from(err: redis::RedisError) -> Self {
        StorageError::Redis(err.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

/// Result type alias for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StorageError::KeyNotFound("chronodium-1-{metric-cpu}-3600-1-raw-7".to_string());
        assert_eq!(
            err.to_string(),
            "Key not found: chronodium-1-{metric-cpu}-3600-1-raw-7"
        );

        let err = StorageError::InvalidTimeRange;
        assert_eq!(
            err.to_string(),
            "Invalid time range: start must be before or equal to end"
        );

        let err = StorageError::Timeout(250);
        assert_eq!(err.to_string(), "Store command timed out after 250 ms");
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let storage_err: StorageError = json_err.into();
        assert!(matches!(storage_err, StorageError::Serialization(_)));
    }
}

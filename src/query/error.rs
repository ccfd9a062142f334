//! Query error types
//!
//! Defines all error conditions that can occur while validating and
//! executing a windowed query.

use thiserror::Error;

/// Errors that can occur during query operations
#[derive(Error, Debug)]
pub enum QueryError {
    /// Invalid time range specified
    #[error("Invalid time range: {0}")]
    InvalidTimeRange(String),

    /// Storage layer error (only surfaced under the fail-fast policy)
    #[error("Storage error: {0}")]
    Storage(#[from] crate::storage::StorageError),

    /// The query did not finish before its deadline
    #[error("Query timed out after {0} ms")]
    Timeout(u64),
}

/// Result type for query operations
pub type QueryResult<T> = Result<T, QueryError>;

//! Application State
//!
//! Shared state accessible by all API handlers.
//! Wrapped in Arc for thread-safe sharing across async tasks.

use crate::config::ApiConfig;
use crate::query::QueryEngine;
use crate::storage::Store;
use std::sync::Arc;
use std::time::Instant;

/// Shared application state for all handlers
#[derive(Clone)]
pub struct AppState {
    /// Query engine answering windowed reads
    pub engine: Arc<QueryEngine>,
    /// Store behind the engine, used for readiness checks
    pub store: Arc<dyn Store>,
    /// API configuration
    pub config: Arc<ApiConfig>,
    /// Server start time for uptime tracking
    pub start_time: Instant,
}

impl AppState {
    pub fn new(engine: Arc<QueryEngine>, store: Arc<dyn Store>, config: ApiConfig) -> Self {
        Self {
            engine,
            store,
            config: Arc::new(config),
            start_time: Instant::now(),
        }
    }

    /// Get server uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

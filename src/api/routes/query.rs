//! Query Routes
//!
//! Endpoint for executing windowed queries.
//!
//! - POST /api/v1/query - Execute a query

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Instant;

use crate::api::dto::{QueryMeta, QueryRequest, QueryResponse, TimeValue};
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::query::{parse_time_expr, Query};

/// POST /api/v1/query
///
/// Execute a query and return the points with scan metadata.
pub async fn execute_query(
    State(state): State<Arc<AppState>>,
    Json(req): Json<QueryRequest>,
) -> ApiResult<Json<QueryResponse>> {
    if req.shard_key.is_empty() {
        return Err(ApiError::Validation("shard_key cannot be empty".to_string()));
    }

    let now = Utc::now();
    let start = resolve_time(&req.start, now)?;
    let end = resolve_time(&req.end, now)?;

    let query = Query::new(req.shard_key, start, end).filter(req.filter);

    let started = Instant::now();
    let result = state.engine.query(&query).await?;
    let execution_time_ms = started.elapsed().as_millis() as u64;

    let meta = QueryMeta {
        point_count: result.len(),
        partial: result.is_partial(),
        warnings: result.warnings().to_vec(),
        execution_time_ms,
    };

    Ok(Json(QueryResponse {
        points: result.into_points(),
        meta,
    }))
}

/// Resolve a client time value against `now`
fn resolve_time(value: &TimeValue, now: DateTime<Utc>) -> ApiResult<DateTime<Utc>> {
    match value {
        TimeValue::Nanos(ns) => Ok(DateTime::from_timestamp_nanos(*ns)),
        TimeValue::Text(s) => Ok(parse_time_expr(s, now)?),
    }
}

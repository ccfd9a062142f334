//! Metrics Routes
//!
//! - GET /api/v1/metrics - List known shard keys

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::api::dto::MetricListResponse;
use crate::api::error::ApiResult;
use crate::api::state::AppState;

/// GET /api/v1/metrics
///
/// Metric discovery is not backed by the store yet, so the list is empty.
pub async fn list_metrics(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<MetricListResponse>> {
    let metrics = state.engine.metric_names().await?;
    Ok(Json(MetricListResponse { metrics }))
}

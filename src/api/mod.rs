//! Chronodium REST API
//!
//! HTTP API layer for Chronodium, built with Axum.
//!
//! # Endpoints
//!
//! ## Query
//! - `POST /api/v1/query` - Execute a windowed query
//!
//! ## Metrics
//! - `GET /api/v1/metrics` - List known metrics
//!
//! ## Health
//! - `GET /health/live` - Liveness probe
//! - `GET /health/ready` - Readiness probe
//! - `GET /health` - Full health status
//!
//! # Example
//!
//! ```rust,ignore
//! use chronodium::api::{serve, ApiConfig, AppState};
//! use chronodium::query::{QueryEngine, QueryOptions};
//! use chronodium::storage::{KeySchema, RedisStore, RedisStoreConfig, Store};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store: Arc<dyn Store> = Arc::new(RedisStore::connect(&RedisStoreConfig::default()).await?);
//!     let engine = Arc::new(QueryEngine::new(Arc::clone(&store), KeySchema::default(), QueryOptions::default()));
//!     let config = ApiConfig::default();
//!
//!     serve(AppState::new(engine, store, config.clone()), &config).await?;
//!     Ok(())
//! }
//! ```

pub mod dto;
pub mod error;
pub mod routes;
pub mod state;

pub use crate::config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use state::AppState;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Build the API router with all routes and middleware
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/query", post(routes::query::execute_query))
        .route("/metrics", get(routes::metrics::list_metrics));

    let health_routes = Router::new()
        .route("/live", get(routes::health::liveness))
        .route("/ready", get(routes::health::readiness))
        .route("/", get(routes::health::full_health));

    let shared_state = Arc::new(state);

    Router::new()
        .nest("/api/v1", api_routes)
        .nest("/health", health_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(shared_state)
}

/// Start the API server
pub async fn serve(state: AppState, config: &ApiConfig) -> Result<(), ApiError> {
    let router = build_router(state);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Chronodium API listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ApiError::Internal(format!("Server error: {}", e)))?;

    tracing::info!("Chronodium API shut down gracefully");
    Ok(())
}

/// Wait for Ctrl-C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{QueryEngine, QueryOptions};
    use crate::storage::{
        encode_points, BucketId, KeySchema, MemoryStore, Metadata, MetadataHash, StorageError,
        StorageResult, Store,
    };
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use tower::util::ServiceExt;

    const HOUR_NS: i64 = 3_600_000_000_000;

    fn app_with_store(store: Arc<dyn Store>) -> Router {
        let engine = Arc::new(QueryEngine::new(
            Arc::clone(&store),
            KeySchema::default(),
            QueryOptions::default(),
        ));
        build_router(AppState::new(engine, store, ApiConfig::default()))
    }

    async fn create_test_app() -> Router {
        let store = Arc::new(MemoryStore::new());
        let schema = KeySchema::default();
        let tags = Metadata::from([("host".to_string(), "web-1".to_string())]);

        store
            .put_group(
                &schema,
                "cpu",
                BucketId::new(0),
                MetadataHash::new(7),
                &tags,
                encode_points(&[(HOUR_NS / 2, 0.5), (HOUR_NS / 4, 0.25)]),
            )
            .await
            .unwrap();

        app_with_store(store)
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_query(body: String) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/v1/query")
            .header("Content-Type", "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    struct DownStore;

    #[async_trait::async_trait]
    impl Store for DownStore {
        async fn get_sorted_set_with_scores(&self, key: &str) -> StorageResult<Vec<(String, f64)>> {
            Err(StorageError::Redis(format!("refused reading {}", key)))
        }

        async fn get_bytes(&self, key: &str) -> StorageResult<Vec<u8>> {
            Err(StorageError::Redis(format!("refused reading {}", key)))
        }

        async fn ping(&self) -> StorageResult<()> {
            Err(StorageError::Redis("connection refused".to_string()))
        }
    }

    #[tokio::test]
    async fn test_health_live() {
        let app = create_test_app().await;

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health/live")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_health_ready() {
        let app = create_test_app().await;

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health/ready")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_health_store_down() {
        let app = app_with_store(Arc::new(DownStore));

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/health/ready")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["status"], "unhealthy");
        assert_eq!(body["store"], "error");
    }

    #[tokio::test]
    async fn test_health_reports_listen_addr() {
        let app = create_test_app().await;

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let body = json_body(response).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["listen"], "0.0.0.0:8086");
    }

    #[tokio::test]
    async fn test_list_metrics_empty() {
        let app = create_test_app().await;

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/metrics")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["metrics"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_query_points() {
        let app = create_test_app().await;

        let response = app
            .oneshot(post_query(format!(
                r#"{{"shard_key":"cpu","start":0,"end":{},"filter":{{"host":"web-1"}}}}"#,
                HOUR_NS
            )))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;

        assert_eq!(body["meta"]["point_count"], 2);
        assert_eq!(body["meta"]["partial"], false);
        assert_eq!(body["points"][0]["_value"], "0.25");
        assert_eq!(body["points"][0]["_date"], "1970-01-01T00:15:00Z");
        assert_eq!(body["points"][1]["host"], "web-1");
    }

    #[tokio::test]
    async fn test_query_filter_excludes() {
        let app = create_test_app().await;

        let response = app
            .oneshot(post_query(format!(
                r#"{{"shard_key":"cpu","start":0,"end":{},"filter":{{"host":"web-2"}}}}"#,
                HOUR_NS
            )))
            .await
            .unwrap();

        let body = json_body(response).await;
        assert_eq!(body["meta"]["point_count"], 0);
    }

    #[tokio::test]
    async fn test_query_reversed_window() {
        let app = create_test_app().await;

        let response = app
            .oneshot(post_query(
                r#"{"shard_key":"cpu","start":"now","end":"now-1h"}"#.to_string(),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["error"]["code"], "INVALID_TIME_RANGE");
        assert!(body["request_id"].is_string());
    }

    #[tokio::test]
    async fn test_query_window_too_wide() {
        let app = create_test_app().await;

        let response = app
            .oneshot(post_query(format!(
                r#"{{"shard_key":"cpu","start":{},"end":{}}}"#,
                i64::MIN + 1,
                i64::MAX
            )))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["error"]["code"], "INVALID_TIME_RANGE");
    }

    #[tokio::test]
    async fn test_query_bad_timestamp() {
        let app = create_test_app().await;

        let response = app
            .oneshot(post_query(
                r#"{"shard_key":"cpu","start":"yesterday","end":"now"}"#.to_string(),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_query_partial_result() {
        let app = app_with_store(Arc::new(DownStore));

        let response = app
            .oneshot(post_query(format!(
                r#"{{"shard_key":"cpu","start":0,"end":{}}}"#,
                HOUR_NS
            )))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["meta"]["partial"], true);
        assert_eq!(body["meta"]["warnings"][0]["kind"], "index_fetch");
    }

    #[tokio::test]
    async fn test_query_invalid_json() {
        let app = create_test_app().await;

        let response = app.oneshot(post_query("not json".to_string())).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}

//! Chronodium API Server
//!
//! Run with: cargo run --bin chronodium [-- path/to/config.toml]
//!
//! Without a path the config is looked up in the user config directory,
//! `/etc/chronodium/config.toml` and `./config.toml`, then overridden by
//! `CHRONODIUM_*` environment variables. `RUST_LOG` overrides the log level.

use anyhow::Context;
use chronodium::api::{serve, AppState};
use chronodium::config::Config;
use chronodium::query::QueryEngine;
use chronodium::storage::{redact_url, RedisStore, Store};
use std::path::PathBuf;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .or_else(Config::default_path);
    let config = match &path {
        Some(path) => Config::load_with_env(path)?,
        None => Config::from_env(),
    };
    config.validate()?;

    chronodium::logging::init(&config.logging)?;

    tracing::info!("Starting Chronodium v{}", env!("CARGO_PKG_VERSION"));
    match &path {
        Some(path) => tracing::info!("Loaded config from {:?}", path),
        None => tracing::info!("Using default config with environment overrides"),
    }
    for setting in config.ignored_overrides() {
        tracing::warn!("Ignoring unparseable {}", setting);
    }

    let schema = config.key_schema()?;
    tracing::info!(
        "Bucket window: {}s, schema version {}",
        schema.bucket_window,
        schema.schema_version
    );

    let redis_config = config.redis_config();
    let store: Arc<dyn Store> = Arc::new(
        RedisStore::connect(&redis_config)
            .await
            .with_context(|| format!("connecting to {}", redact_url(&redis_config.url)))?,
    );

    let options = config.query_options();
    tracing::info!(
        "Failure policy: {:?}, {} concurrent buckets, at most {} buckets per query",
        options.failure_policy,
        options.max_concurrent_buckets,
        options.max_buckets
    );
    let engine = Arc::new(QueryEngine::new(Arc::clone(&store), schema, options));

    let state = AppState::new(engine, store, config.api.clone());
    serve(state, &config.api).await?;

    tracing::info!("Chronodium shutdown complete");
    Ok(())
}

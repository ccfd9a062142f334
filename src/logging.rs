//! Tracing subscriber setup shared by the binaries

use crate::config::LoggingConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    /// Unknown names fall back to pretty output
    pub fn from_name(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}

/// Filter directives: `RUST_LOG` when set, otherwise the configured level
/// applied to this crate with HTTP tracing one step quieter
pub fn filter_directives(config: &LoggingConfig, rust_log: Option<String>) -> String {
    match rust_log {
        Some(directives) if !directives.trim().is_empty() => directives,
        _ => format!(
            "chronodium={},tower_http={}",
            config.level,
            quieter(&config.level)
        ),
    }
}

/// One level below `level`; unknown names map to warn
fn quieter(level: &str) -> &'static str {
    match level.to_lowercase().as_str() {
        "trace" => "debug",
        "debug" => "info",
        "info" => "warn",
        "warn" | "error" => "error",
        "off" => "off",
        _ => "warn",
    }
}

/// Install the global subscriber
///
/// Fails if a subscriber is already installed or the directives are invalid.
pub fn init(config: &LoggingConfig) -> anyhow::Result<()> {
    let directives = filter_directives(config, std::env::var("RUST_LOG").ok());
    let filter = EnvFilter::try_new(&directives)?;
    let registry = tracing_subscriber::registry().with(filter);

    match LogFormat::from_name(&config.format) {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()?,
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).try_init()?,
    }

    Ok(())
}

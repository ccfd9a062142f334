//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use crate::query::{FailurePolicy, QueryOptions};
use crate::storage::{
    KeySchema, RedisStoreConfig, StorageResult, DEFAULT_BUCKET_WINDOW_SECS,
    DEFAULT_SCHEMA_VERSION,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub buckets: BucketConfig,

    #[serde(default)]
    pub query: QueryConfig,

    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Environment overrides that could not be parsed
    #[serde(skip)]
    ignored_overrides: Vec<String>,
}

/// Redis connection configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_redis_url")]
    pub url: String,

    #[serde(default = "default_connection_timeout")]
    pub connection_timeout_ms: u64,

    #[serde(default = "default_command_timeout")]
    pub command_timeout_ms: u64,
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

fn default_connection_timeout() -> u64 {
    5000
}

fn default_command_timeout() -> u64 {
    1000
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
            connection_timeout_ms: default_connection_timeout(),
            command_timeout_ms: default_command_timeout(),
        }
    }
}

/// Bucket layout, must agree with the writer
#[derive(Debug, Clone, Deserialize)]
pub struct BucketConfig {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,

    #[serde(default = "default_window_secs")]
    pub window_secs: i64,
}

fn default_schema_version() -> u32 {
    DEFAULT_SCHEMA_VERSION
}

fn default_window_secs() -> i64 {
    DEFAULT_BUCKET_WINDOW_SECS
}

impl Default for BucketConfig {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            window_secs: default_window_secs(),
        }
    }
}

/// Query engine configuration
#[derive(Debug, Clone, Deserialize)]
pub struct QueryConfig {
    #[serde(default)]
    pub failure_policy: FailurePolicy,

    #[serde(default = "default_max_concurrent_buckets")]
    pub max_concurrent_buckets: usize,

    #[serde(default = "default_strict_blob_length")]
    pub strict_blob_length: bool,

    /// 0 disables the deadline
    #[serde(default = "default_query_timeout")]
    pub timeout_ms: u64,

    /// Widest window a query may span, in buckets
    #[serde(default = "default_max_buckets")]
    pub max_buckets: u64,
}

fn default_max_concurrent_buckets() -> usize {
    8
}

fn default_strict_blob_length() -> bool {
    true
}

fn default_query_timeout() -> u64 {
    30_000
}

fn default_max_buckets() -> u64 {
    10_000
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            failure_policy: FailurePolicy::default(),
            max_concurrent_buckets: default_max_concurrent_buckets(),
            strict_blob_length: default_strict_blob_length(),
            timeout_ms: default_query_timeout(),
            max_buckets: default_max_buckets(),
        }
    }
}

/// API server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8086
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ApiConfig {
    /// Create config with custom host and port
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Get the socket address string
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// First config file found in the default locations
    ///
    /// Callers load it with [`Config::load_with_env`], or fall back to
    /// [`Config::from_env`] when nothing is found. Loading is left to the
    /// caller so the outcome can be logged once the subscriber is installed.
    pub fn default_path() -> Option<PathBuf> {
        first_existing(&[
            dirs::config_dir().map(|p| p.join("chronodium").join("config.toml")),
            Some(PathBuf::from("/etc/chronodium/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ])
    }

    /// Check values the rest of the crate cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.buckets.window_secs <= 0 {
            return Err(ConfigError::Invalid(format!(
                "buckets.window_secs must be positive, got {}",
                self.buckets.window_secs
            )));
        }
        if self.query.max_concurrent_buckets == 0 {
            return Err(ConfigError::Invalid(
                "query.max_concurrent_buckets must be at least 1".to_string(),
            ));
        }
        if self.query.max_buckets == 0 {
            return Err(ConfigError::Invalid(
                "query.max_buckets must be at least 1".to_string(),
            ));
        }
        if self.store.url.is_empty() {
            return Err(ConfigError::Invalid("store.url must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn key_schema(&self) -> StorageResult<KeySchema> {
        KeySchema::new(self.buckets.schema_version, self.buckets.window_secs)
    }

    pub fn query_options(&self) -> QueryOptions {
        QueryOptions {
            failure_policy: self.query.failure_policy,
            max_concurrent_buckets: self.query.max_concurrent_buckets.max(1),
            strict_blob_length: self.query.strict_blob_length,
            timeout: match self.query.timeout_ms {
                0 => None,
                ms => Some(Duration::from_millis(ms)),
            },
            max_buckets: self.query.max_buckets,
        }
    }

    pub fn redis_config(&self) -> RedisStoreConfig {
        RedisStoreConfig {
            url: self.store.url.clone(),
            connection_timeout: Duration::from_millis(self.store.connection_timeout_ms),
            command_timeout: Duration::from_millis(self.store.command_timeout_ms),
        }
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    fn ignore(&mut self, setting: String) {
        self.ignored_overrides.push(setting);
    }

    /// Environment overrides skipped because their value did not parse,
    /// for logging once the subscriber is up
    pub fn ignored_overrides(&self) -> &[String] {
        &self.ignored_overrides
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        // Store overrides
        if let Some(url) = var("CHRONODIUM_REDIS_URL") {
            self.store.url = url;
        }

        // Bucket overrides
        if let Some(window) = var("CHRONODIUM_BUCKET_WINDOW") {
            match window.parse() {
                Ok(w) => self.buckets.window_secs = w,
                Err(_) => self.ignore(format!("CHRONODIUM_BUCKET_WINDOW={}", window)),
            }
        }
        if let Some(version) = var("CHRONODIUM_SCHEMA_VERSION") {
            match version.parse() {
                Ok(v) => self.buckets.schema_version = v,
                Err(_) => self.ignore(format!("CHRONODIUM_SCHEMA_VERSION={}", version)),
            }
        }

        // Query overrides
        if let Some(policy) = var("CHRONODIUM_FAILURE_POLICY") {
            match policy.parse::<FailurePolicy>() {
                Ok(p) => self.query.failure_policy = p,
                Err(e) => self.ignore(format!("CHRONODIUM_FAILURE_POLICY: {}", e)),
            }
        }

        // API overrides
        if let Some(host) = var("CHRONODIUM_API_HOST") {
            self.api.host = host;
        }
        if let Some(port) = var("CHRONODIUM_API_PORT") {
            match port.parse() {
                Ok(p) => self.api.port = p,
                Err(_) => self.ignore(format!("CHRONODIUM_API_PORT={}", port)),
            }
        }

        // Logging overrides
        if let Some(level) = var("CHRONODIUM_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = var("CHRONODIUM_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

fn first_existing(candidates: &[Option<PathBuf>]) -> Option<PathBuf> {
    candidates.iter().flatten().find(|p| p.exists()).cloned()
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Chronodium Configuration
#
# Environment variables override these settings:
# - CHRONODIUM_REDIS_URL
# - CHRONODIUM_BUCKET_WINDOW
# - CHRONODIUM_SCHEMA_VERSION
# - CHRONODIUM_FAILURE_POLICY
# - CHRONODIUM_API_HOST
# - CHRONODIUM_API_PORT
# - CHRONODIUM_LOG_LEVEL
# - CHRONODIUM_LOG_FORMAT

[store]
# Redis server holding the bucketed data
url = "redis://127.0.0.1:6379"

# Timeout for establishing the connection (ms)
connection_timeout_ms = 5000

# Timeout for each Redis command (ms)
command_timeout_ms = 1000

[buckets]
# Key schema version written by the writer
schema_version = 1

# Bucket width in seconds; must match the writer
window_secs = 3600

[query]
# fail-open: skip unreadable data and report it as a warning
# fail-fast: abort the query on the first store error
failure_policy = "fail-open"

# Buckets scanned in parallel per query
max_concurrent_buckets = 8

# Reject blobs whose length is not a multiple of 16 bytes
strict_blob_length = true

# Per-query deadline (ms), 0 disables it
timeout_ms = 30000

# Widest window a query may cover, in buckets
max_buckets = 10000

[api]
# API server host
host = "0.0.0.0"

# API server port
port = 8086

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}

//! Chronodium CLI
//!
//! Command-line interface for Chronodium operations:
//! - Run a windowed query straight against Redis
//! - Show the bucket keys a window touches
//! - Generate a config file

use anyhow::{bail, Context};
use chrono::Utc;
use chronodium::config::{Config, LoggingConfig};
use chronodium::query::{parse_time_expr, Query, QueryEngine, ResultSet};
use chronodium::storage::{
    bucket_count, enumerate_buckets, format_date, format_value, RedisStore, Store,
};
use clap::{Parser, Subcommand, ValueEnum};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "chronodium-cli")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Read windowed time series out of a bucketed Redis store")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: standard locations, then environment)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Query points of a shard
    Query {
        /// Shard key (metric name)
        #[arg(short, long)]
        shard: String,
        /// Window start: RFC 3339, nanoseconds, "now" or "now-<n><s|m|h|d|w>"
        #[arg(long, default_value = "now-1h")]
        from: String,
        /// Window end, same forms as --from
        #[arg(long, default_value = "now")]
        to: String,
        /// Tag filter in key=value format
        #[arg(short = 'F', long = "filter")]
        filters: Vec<String>,
        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// Print the index keys a window touches
    Buckets {
        /// Shard key (metric name)
        #[arg(short, long)]
        shard: String,
        #[arg(long, default_value = "now-1h")]
        from: String,
        #[arg(long, default_value = "now")]
        to: String,
    },

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let path = cli.config.clone().or_else(Config::default_path);
    let config = match &path {
        Some(path) => Config::load_with_env(path)?,
        None => Config::from_env(),
    };
    config.validate()?;

    // Keep stdout clean for query output
    chronodium::logging::init(&LoggingConfig {
        level: "warn".to_string(),
        format: config.logging.format.clone(),
    })?;

    if let Some(path) = &path {
        tracing::debug!("Loaded config from {:?}", path);
    }
    for setting in config.ignored_overrides() {
        tracing::warn!("Ignoring unparseable {}", setting);
    }

    match cli.command {
        Commands::Query {
            shard,
            from,
            to,
            filters,
            format,
        } => {
            let now = Utc::now();
            let start = parse_time_expr(&from, now)?;
            let end = parse_time_expr(&to, now)?;
            let filter = parse_filters(&filters)?;

            let redis_config = config.redis_config();
            let store: Arc<dyn Store> = Arc::new(
                RedisStore::connect(&redis_config)
                    .await
                    .context("Cannot connect to Redis")?,
            );
            let engine = QueryEngine::new(store, config.key_schema()?, config.query_options());

            let result = engine
                .query(&Query::new(shard, start, end).filter(filter))
                .await?;

            match format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(result.points())?);
                }
                OutputFormat::Table => print_table(&result),
            }

            for warning in result.warnings() {
                eprintln!(
                    "warning: bucket {} ({}): {}",
                    warning.bucket, warning.key, warning.message
                );
            }
            if result.is_partial() {
                eprintln!("Result is partial, some data could not be read");
            }
        }

        Commands::Buckets { shard, from, to } => {
            let now = Utc::now();
            let start = parse_time_expr(&from, now)?;
            let end = parse_time_expr(&to, now)?;
            let schema = config.key_schema()?;

            let count = bucket_count(&schema, start, end)?;
            if count > config.query.max_buckets {
                bail!(
                    "Window spans up to {} buckets, limit is {} (query.max_buckets)",
                    count,
                    config.query.max_buckets
                );
            }

            for bucket in enumerate_buckets(&schema, start, end)? {
                println!("{}", schema.index_key(&shard, bucket));
            }
        }

        Commands::Config { output } => {
            let content = chronodium::config::generate_default_config();

            match output {
                Some(path) => {
                    if let Some(parent) = path.parent() {
                        std::fs::create_dir_all(parent)?;
                    }
                    std::fs::write(&path, &content)?;
                    println!("Config written to {:?}", path);
                }
                None => {
                    print!("{}", content);
                }
            }
        }
    }

    Ok(())
}

fn parse_filters(filters: &[String]) -> anyhow::Result<HashMap<String, String>> {
    let mut map = HashMap::new();
    for filter in filters {
        let Some((key, value)) = filter.split_once('=') else {
            bail!("Invalid filter: {}. Use key=value", filter);
        };
        map.insert(key.to_string(), value.to_string());
    }
    Ok(map)
}

fn print_table(result: &ResultSet) {
    if result.is_empty() {
        println!("No data for the selected time range");
        return;
    }

    // Tag columns in a stable order
    let mut tag_keys: Vec<&String> = result
        .points()
        .iter()
        .flat_map(|p| p.metadata().keys())
        .collect();
    tag_keys.sort();
    tag_keys.dedup();

    print!("{:<32} | {:<14}", "Date", "Value");
    for key in &tag_keys {
        print!(" | {:<12}", key);
    }
    println!();
    println!("{}", "-".repeat(49 + tag_keys.len() * 15));

    for point in result.points() {
        print!(
            "{:<32} | {:<14}",
            format_date(point.timestamp()),
            format_value(point.value())
        );
        for key in &tag_keys {
            let tag = point.metadata().get(*key).map(String::as_str).unwrap_or("-");
            print!(" | {:<12}", tag);
        }
        println!();
    }

    println!();
    println!(
        "{} points from {} buckets",
        result.len(),
        result.buckets_scanned()
    );
}

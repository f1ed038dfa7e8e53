//! Configuration infrastructure
//!
//! Serde-backed configuration for the rescrape engine, organized by
//! pipeline concern: crawling (fetch/retry/concurrency), proxy pool,
//! scheduler and logging. Values load from a JSON file whose path comes
//! from the CLI or the `PRICEWATCH_CONFIG` environment variable; a missing
//! file falls back to defaults so the engine runs out of the box.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::info;

/// Default values for all tunables, in one place.
pub mod defaults {
    /// Fetch attempts per task attempt, proxy-rotated.
    pub const MAX_FETCH_ATTEMPTS: u32 = 3;
    /// Fixed pause between fetch attempts.
    pub const FETCH_RETRY_DELAY_SECS: u64 = 2;
    /// Per-request HTTP timeout.
    pub const REQUEST_TIMEOUT_SECS: u64 = 30;
    /// Concurrent tasks in a batch.
    pub const MAX_CONCURRENT_TASKS: usize = 8;
    /// Wall-clock budget for one whole task.
    pub const TASK_TIMEOUT_SECS: u64 = 120;
    /// Task-level re-enqueue budget.
    pub const TASK_MAX_RETRIES: u32 = 3;
    /// Fixed task-level backoff.
    pub const TASK_RETRY_DELAY_SECS: u64 = 60;

    /// Proxy pool service base URL.
    pub const PROXY_POOL_URL: &str = "http://127.0.0.1:8900";
    /// Proxy list cache TTL.
    pub const PROXY_CACHE_TTL_SECS: u64 = 60;
    /// Attempts per pool-service call.
    pub const PROXY_MAX_ATTEMPTS: u32 = 3;

    /// Batch size for a scheduling run.
    pub const SCHEDULER_BATCH_SIZE: u32 = 100;
    /// Entries older than this are due for re-extraction.
    pub const SCHEDULER_MAX_AGE_HOURS: i64 = 24;
    /// The repository is asked for this many times `limit` candidates so
    /// the ranking has a pool to work with.
    pub const SCHEDULER_POOL_MULTIPLIER: u32 = 3;

    pub const LOG_LEVEL: &str = "info";
    pub const LOG_CONSOLE_OUTPUT: bool = true;
    pub const LOG_FILE_OUTPUT: bool = false;
    pub const LOG_DIR: &str = "logs";
}

/// Environment variable naming the config file path.
pub const CONFIG_PATH_ENV: &str = "PRICEWATCH_CONFIG";

/// Complete application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub crawling: CrawlingConfig,
    pub proxy: ProxyConfig,
    pub scheduler: SchedulerConfig,
    pub logging: LoggingConfig,
}

/// Fetch, retry and concurrency settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlingConfig {
    /// Fetch attempts per task attempt (outer retry loop).
    pub max_fetch_attempts: u32,

    /// Fixed pause between fetch attempts, in seconds.
    pub fetch_retry_delay_secs: u64,

    /// Per-request HTTP timeout in seconds.
    pub request_timeout_secs: u64,

    /// Maximum concurrent tasks in a batch.
    pub max_concurrent_tasks: usize,

    /// Wall-clock timeout for a whole task, in seconds.
    pub task_timeout_secs: u64,

    /// Task-level retry budget for retryable failures.
    pub task_max_retries: u32,

    /// Fixed delay before a task-level retry, in seconds.
    pub task_retry_delay_secs: u64,
}

impl Default for CrawlingConfig {
    fn default() -> Self {
        Self {
            max_fetch_attempts: defaults::MAX_FETCH_ATTEMPTS,
            fetch_retry_delay_secs: defaults::FETCH_RETRY_DELAY_SECS,
            request_timeout_secs: defaults::REQUEST_TIMEOUT_SECS,
            max_concurrent_tasks: defaults::MAX_CONCURRENT_TASKS,
            task_timeout_secs: defaults::TASK_TIMEOUT_SECS,
            task_max_retries: defaults::TASK_MAX_RETRIES,
            task_retry_delay_secs: defaults::TASK_RETRY_DELAY_SECS,
        }
    }
}

/// Proxy pool service client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Base URL of the proxy pool service.
    pub pool_url: String,

    /// Whether to request proxies at all. Disabled means every fetch goes
    /// direct (still logged as such).
    pub enabled: bool,

    /// Proxy list cache TTL in seconds.
    pub cache_ttl_secs: u64,

    /// Attempts per pool-service call (network/5xx only).
    pub max_attempts: u32,

    /// Use the static fallback list when the pool service is down.
    pub fallback_enabled: bool,

    /// Static fallback proxies as "host:port".
    pub fallback_proxies: Vec<String>,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            pool_url: defaults::PROXY_POOL_URL.to_string(),
            enabled: true,
            cache_ttl_secs: defaults::PROXY_CACHE_TTL_SECS,
            max_attempts: defaults::PROXY_MAX_ATTEMPTS,
            fallback_enabled: true,
            fallback_proxies: Vec::new(),
        }
    }
}

/// Rescrape scheduling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Default batch size when the CLI does not override it.
    pub batch_size: u32,

    /// Default staleness threshold in hours.
    pub max_age_hours: i64,

    /// Candidate pool width requested from the repository, as a multiple
    /// of the batch size.
    pub pool_multiplier: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            batch_size: defaults::SCHEDULER_BATCH_SIZE,
            max_age_hours: defaults::SCHEDULER_MAX_AGE_HOURS,
            pool_multiplier: defaults::SCHEDULER_POOL_MULTIPLIER,
        }
    }
}

/// Logging configuration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub level: String,

    /// Enable console output.
    pub console_output: bool,

    /// Enable file output.
    pub file_output: bool,

    /// Directory for log files when file output is enabled.
    pub log_dir: String,

    /// Module-specific log level filters (e.g. "reqwest": "warn").
    pub module_filters: HashMap<String, String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::LOG_LEVEL.to_string(),
            console_output: defaults::LOG_CONSOLE_OUTPUT,
            file_output: defaults::LOG_FILE_OUTPUT,
            log_dir: defaults::LOG_DIR.to_string(),
            module_filters: {
                let mut filters = HashMap::new();
                filters.insert("reqwest".to_string(), "warn".to_string());
                filters.insert("hyper".to_string(), "warn".to_string());
                filters.insert("html5ever".to_string(), "error".to_string());
                filters.insert("selectors".to_string(), "warn".to_string());
                filters
            },
        }
    }
}

/// Loads and persists the application configuration.
pub struct ConfigManager {
    config_path: Option<PathBuf>,
}

impl ConfigManager {
    /// Resolve the config path from an explicit argument or the
    /// `PRICEWATCH_CONFIG` environment variable.
    #[must_use]
    pub fn new(explicit_path: Option<PathBuf>) -> Self {
        let config_path = explicit_path
            .or_else(|| std::env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from));
        Self { config_path }
    }

    /// Load the configuration, falling back to defaults when no file is
    /// configured or the configured file does not exist.
    pub async fn load(&self) -> Result<AppConfig> {
        let Some(path) = &self.config_path else {
            info!("no config file specified, using defaults");
            return Ok(AppConfig::default());
        };

        if !path.exists() {
            info!(path = %path.display(), "config file missing, using defaults");
            return Ok(AppConfig::default());
        }

        Self::load_from_file(path).await
    }

    async fn load_from_file(path: &Path) -> Result<AppConfig> {
        let contents = fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: AppConfig = serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        info!(path = %path.display(), "loaded configuration");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_policies() {
        let config = AppConfig::default();
        assert_eq!(config.crawling.max_fetch_attempts, 3);
        assert_eq!(config.crawling.fetch_retry_delay_secs, 2);
        assert_eq!(config.crawling.task_timeout_secs, 120);
        assert_eq!(config.scheduler.batch_size, 100);
        assert_eq!(config.scheduler.max_age_hours, 24);
        assert_eq!(config.proxy.cache_ttl_secs, 60);
    }

    #[test]
    fn partial_config_files_fill_from_defaults() {
        let partial = r#"{ "crawling": { "max_concurrent_tasks": 2 } }"#;
        let config: AppConfig = serde_json::from_str(partial).unwrap();
        assert_eq!(config.crawling.max_concurrent_tasks, 2);
        assert_eq!(config.crawling.max_fetch_attempts, defaults::MAX_FETCH_ATTEMPTS);
        assert_eq!(config.scheduler.batch_size, defaults::SCHEDULER_BATCH_SIZE);
    }

    #[test]
    fn config_round_trips_through_json() {
        let config = AppConfig::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let back: AppConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.proxy.pool_url, config.proxy.pool_url);
        assert_eq!(back.logging.level, config.logging.level);
    }
}

//! Process configuration read from environment variables
//!
//! | Variable | Default |
//! |---|---|
//! | `APP_NAME` | `queue-pusher` |
//! | `HOST` / `PORT` | `0.0.0.0` / `8080` |
//! | `QUEUE_BACKEND` | `sqs` (`sqs` or `memory`) |
//! | `QUEUE_NAME` | empty |
//! | `QUEUE_URL` | required for `sqs` |
//! | `QUEUE_PARALLEL` | `10` |
//! | `QUEUE_TIMEOUT_MS` | `1000` (minimum `1000`) |
//! | `CONSUMER_WORKERS` | available cores minus one, at least 1 |
//! | `CONSUMER_STRATEGY` | `async` |
//! | `PUSHER_TARGET_ENDPOINT` | required |
//! | `PUSHER_TIMEOUT_MS` | `5000` |
//! | `PUSHER_STRICT_OK` | `false` |
//! | `CONSUMERS_DISTRIBUTED` | `false` |
//! | `REDIS_URL` | `redis://127.0.0.1:6379` |
//! | `LOG_FORMAT` | `text` (`text` or `json`) |
//!
//! Empty values are treated as unset.

use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::consumer::{default_worker_count, ConsumerConfig};
use crate::forwarder::ForwarderConfig;
use crate::queue::{SqsQueueConfig, MAX_BATCH_SIZE, MIN_QUEUE_TIMEOUT};

/// Configuration errors, reported once at startup
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {key}: {value:?} ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Queue implementation to consume from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueBackend {
    Sqs,
    /// Process-local queue, for local runs
    Memory,
}

impl FromStr for QueueBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sqs" => Ok(QueueBackend::Sqs),
            "memory" => Ok(QueueBackend::Memory),
            _ => Err("expected sqs or memory".to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => Err("expected text or json".to_string()),
        }
    }
}

/// Complete process configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub app_name: String,
    pub host: IpAddr,
    pub port: u16,
    pub queue_backend: QueueBackend,
    pub queue_name: String,
    pub queue_url: String,
    pub queue_parallel: usize,
    pub queue_timeout: Duration,
    pub workers: usize,
    pub strategy: String,
    pub target_endpoint: String,
    pub pusher_timeout: Duration,
    pub strict_ok: bool,
    pub distributed: bool,
    pub redis_url: String,
    pub log_format: LogFormat,
}

impl AppConfig {
    /// Read the configuration from the process environment
    ///
    /// # Errors
    ///
    /// Returns the first missing or malformed variable.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the configuration through an arbitrary lookup function
    ///
    /// # Example
    ///
    /// ```
    /// use std::collections::HashMap;
    /// use queue_pusher::config::{AppConfig, QueueBackend};
    ///
    /// let vars = HashMap::from([
    ///     ("QUEUE_BACKEND", "memory"),
    ///     ("PUSHER_TARGET_ENDPOINT", "http://localhost:3000/events"),
    /// ]);
    /// let config = AppConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string())).unwrap();
    /// assert_eq!(config.queue_backend, QueueBackend::Memory);
    /// assert_eq!(config.port, 8080);
    /// ```
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Lookup(lookup);

        let queue_backend = vars.parse("QUEUE_BACKEND", QueueBackend::Sqs)?;
        let queue_url = vars.string("QUEUE_URL", "");
        if queue_backend == QueueBackend::Sqs && queue_url.is_empty() {
            return Err(ConfigError::Missing("QUEUE_URL"));
        }

        let queue_parallel = vars.parse("QUEUE_PARALLEL", MAX_BATCH_SIZE)?;
        if !(1..=MAX_BATCH_SIZE).contains(&queue_parallel) {
            return Err(ConfigError::Invalid {
                key: "QUEUE_PARALLEL",
                value: queue_parallel.to_string(),
                reason: format!("valid values are 1 to {}", MAX_BATCH_SIZE),
            });
        }

        let queue_timeout = Duration::from_millis(vars.parse("QUEUE_TIMEOUT_MS", 1000)?);
        if queue_timeout < MIN_QUEUE_TIMEOUT {
            return Err(ConfigError::Invalid {
                key: "QUEUE_TIMEOUT_MS",
                value: queue_timeout.as_millis().to_string(),
                reason: format!("at least {}ms is required", MIN_QUEUE_TIMEOUT.as_millis()),
            });
        }

        let workers = vars.parse("CONSUMER_WORKERS", default_worker_count())?;
        if workers == 0 {
            return Err(ConfigError::Invalid {
                key: "CONSUMER_WORKERS",
                value: "0".to_string(),
                reason: "at least 1 worker is required".to_string(),
            });
        }

        let target_endpoint = vars
            .get("PUSHER_TARGET_ENDPOINT")
            .ok_or(ConfigError::Missing("PUSHER_TARGET_ENDPOINT"))?;

        Ok(Self {
            app_name: vars.string("APP_NAME", "queue-pusher"),
            host: vars.parse("HOST", IpAddr::from([0, 0, 0, 0]))?,
            port: vars.parse("PORT", 8080)?,
            queue_backend,
            queue_name: vars.string("QUEUE_NAME", ""),
            queue_url,
            queue_parallel,
            queue_timeout,
            workers,
            strategy: vars.string("CONSUMER_STRATEGY", "async"),
            target_endpoint,
            pusher_timeout: Duration::from_millis(vars.parse("PUSHER_TIMEOUT_MS", 5000)?),
            strict_ok: vars.parse("PUSHER_STRICT_OK", false)?,
            distributed: vars.parse("CONSUMERS_DISTRIBUTED", false)?,
            redis_url: vars.string("REDIS_URL", "redis://127.0.0.1:6379"),
            log_format: vars.parse("LOG_FORMAT", LogFormat::Text)?,
        })
    }

    /// Address the admin server listens on
    pub fn bind_address(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn sqs_config(&self) -> SqsQueueConfig {
        SqsQueueConfig::new(&self.queue_url)
            .with_name(&self.queue_name)
            .with_parallel(self.queue_parallel)
            .with_timeout(self.queue_timeout)
    }

    pub fn forwarder_config(&self) -> ForwarderConfig {
        ForwarderConfig::new(&self.target_endpoint)
            .with_timeout(self.pusher_timeout)
            .with_strict_ok(self.strict_ok)
    }

    pub fn consumer_config(&self) -> ConsumerConfig {
        ConsumerConfig::new()
            .with_workers(self.workers)
            .with_strategy(&self.strategy)
    }
}

struct Lookup<F>(F);

impl<F> Lookup<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    fn string(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    fn parse<T>(&self, key: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: ToString,
    {
        match self.get(key) {
            None => Ok(default),
            Some(value) => value.parse().map_err(|e: T::Err| ConfigError::Invalid {
                key,
                reason: e.to_string(),
                value,
            }),
        }
    }
}

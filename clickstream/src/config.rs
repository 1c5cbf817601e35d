//! Server configuration read from the environment.

use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use crate::errors::ConfigError;
use crate::observability::LogFormat;
use crate::queue::{QueueConfig, RetryPolicy};

/// Everything the server binary needs to run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address.
    #[serde(default = "default_host")]
    pub host: String,
    /// Listen port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Queue behavior.
    #[serde(default)]
    pub queue: QueueConfig,
    /// Producer-side retry for refused enqueues.
    #[serde(default = "RetryPolicy::producer_default")]
    pub accept_retry: RetryPolicy,
    /// Default and maximum page size for the recent-events read.
    #[serde(default = "default_recent_events_limit")]
    pub recent_events_limit: usize,
    /// Log output format.
    #[serde(default)]
    pub log_format: LogFormat,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_recent_events_limit() -> usize {
    100
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            queue: QueueConfig::default(),
            accept_retry: RetryPolicy::producer_default(),
            recent_events_limit: default_recent_events_limit(),
            log_format: LogFormat::default(),
        }
    }
}

impl ServerConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the listen port.
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the queue configuration.
    #[must_use]
    pub fn with_queue(mut self, queue: QueueConfig) -> Self {
        self.queue = queue;
        self
    }

    /// Sets the producer-side retry policy.
    #[must_use]
    pub fn with_accept_retry(mut self, policy: RetryPolicy) -> Self {
        self.accept_retry = policy;
        self
    }

    /// Returns `host:port`.
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Reads the process environment on top of the defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads variables through `lookup` on top of the defaults.
    ///
    /// Unset or empty variables keep their default.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(host) = get("HOST") {
            config.host = host;
        }
        if let Some(port) = parse_var(&get, "PORT")? {
            config.port = port;
        }

        let mut retry = config.queue.retry.clone();
        if let Some(attempts) = parse_var(&get, "INGEST_MAX_ATTEMPTS")? {
            retry = retry.with_max_attempts(attempts);
        }
        if let Some(delay) = parse_var::<u64, _>(&get, "INGEST_RETRY_DELAY_MS")? {
            let cap = retry.max_delay_ms.max(delay);
            retry = retry.with_base_delay_ms(delay).with_max_delay_ms(cap);
        }
        config.queue = config.queue.with_retry(retry);

        if let Some(capacity) = parse_var::<usize, _>(&get, "INGEST_QUEUE_CAPACITY")? {
            config.queue = if capacity == 0 {
                config.queue.unbounded()
            } else {
                config.queue.with_capacity(capacity)
            };
        }
        if let Some(ms) = parse_var::<u64, _>(&get, "INGEST_SINK_TIMEOUT_MS")? {
            config.queue = if ms == 0 {
                config.queue.without_sink_timeout()
            } else {
                config.queue.with_sink_timeout(Duration::from_millis(ms))
            };
        }

        if let Some(attempts) = parse_var(&get, "ACCEPT_MAX_ATTEMPTS")? {
            config.accept_retry = config.accept_retry.with_max_attempts(attempts);
        }
        if let Some(delay) = parse_var::<u64, _>(&get, "ACCEPT_BACKOFF_MS")? {
            let cap = config.accept_retry.max_delay_ms.max(delay);
            config.accept_retry = config
                .accept_retry
                .with_base_delay_ms(delay)
                .with_max_delay_ms(cap);
        }
        if let Some(limit) = parse_var(&get, "RECENT_EVENTS_LIMIT")? {
            config.recent_events_limit = limit;
        }
        if let Some(format) = parse_var(&get, "LOG_FORMAT")? {
            config.log_format = format;
        }

        Ok(config)
    }
}

fn parse_var<T, G>(get: &G, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: Display,
    G: Fn(&str) -> Option<String>,
{
    get(key)
        .map(|value| {
            value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
                key,
                value: value.clone(),
                reason: e.to_string(),
            })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ServerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.bind_address(), "0.0.0.0:5000");
        assert_eq!(config.queue.retry.max_attempts, 3);
        assert_eq!(config.queue.retry.base_delay_ms, 1000);
        assert_eq!(config.accept_retry.base_delay_ms, 5000);
        assert_eq!(config.recent_events_limit, 100);
    }

    #[test]
    fn test_overrides() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("HOST", "127.0.0.1"),
            ("PORT", "8080"),
            ("INGEST_MAX_ATTEMPTS", "5"),
            ("INGEST_RETRY_DELAY_MS", "250"),
            ("INGEST_QUEUE_CAPACITY", "0"),
            ("INGEST_SINK_TIMEOUT_MS", "1500"),
            ("ACCEPT_MAX_ATTEMPTS", "2"),
            ("RECENT_EVENTS_LIMIT", "20"),
            ("LOG_FORMAT", "json"),
        ]))
        .unwrap();

        assert_eq!(config.bind_address(), "127.0.0.1:8080");
        assert_eq!(config.queue.retry.max_attempts, 5);
        assert_eq!(config.queue.retry.base_delay_ms, 250);
        assert_eq!(config.queue.capacity, None);
        assert_eq!(config.queue.sink_timeout(), Some(Duration::from_millis(1500)));
        assert_eq!(config.accept_retry.max_attempts, 2);
        assert_eq!(config.recent_events_limit, 20);
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_empty_values_keep_defaults() {
        let config = ServerConfig::from_lookup(lookup(&[("PORT", " ")])).unwrap();
        assert_eq!(config.port, 5000);
    }

    #[test]
    fn test_invalid_value_is_reported() {
        let err = ServerConfig::from_lookup(lookup(&[("PORT", "eighty")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "PORT", .. }));
        assert!(err.to_string().contains("eighty"));
    }

    #[test]
    fn test_deserialize_partial() {
        let config: ServerConfig = serde_json::from_str(r#"{"port": 9000}"#).unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.queue, QueueConfig::default());
    }
}

//! Configuration for the queue engine and the worker group.
//!
//! Values come from serde (any format the caller likes) or from environment
//! variables:
//! - `KESSEL_SIMULATED_LATENCY_MS` (default 0)
//! - `KESSEL_WORKERS` (default 1)
//! - `KESSEL_POLL_INTERVAL_MS` (default 100)

use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::error::QueueError;

pub const ENV_SIMULATED_LATENCY_MS: &str = "KESSEL_SIMULATED_LATENCY_MS";
pub const ENV_WORKERS: &str = "KESSEL_WORKERS";
pub const ENV_POLL_INTERVAL_MS: &str = "KESSEL_POLL_INTERVAL_MS";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Delay applied before every enqueue and dequeue takes effect.
    pub simulated_latency_ms: u64,
}

impl QueueConfig {
    pub fn from_env() -> Result<Self, QueueError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. `from_env` is this over `std::env::var`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, QueueError> {
        Ok(Self {
            simulated_latency_ms: parse_or(&lookup, ENV_SIMULATED_LATENCY_MS, 0)?,
        })
    }

    pub fn with_simulated_latency(mut self, latency: Duration) -> Self {
        self.simulated_latency_ms = latency.as_millis().try_into().unwrap_or(u64::MAX);
        self
    }

    pub fn simulated_latency(&self) -> Duration {
        Duration::from_millis(self.simulated_latency_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Number of concurrent consumers.
    pub workers: usize,

    /// How long an idle worker sleeps before asking the queue again.
    pub poll_interval_ms: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            workers: 1,
            poll_interval_ms: 100,
        }
    }
}

impl WorkerConfig {
    pub fn from_env() -> Result<Self, QueueError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, QueueError> {
        let defaults = Self::default();
        let config = Self {
            workers: parse_or(&lookup, ENV_WORKERS, defaults.workers)?,
            poll_interval_ms: parse_or(&lookup, ENV_POLL_INTERVAL_MS, defaults.poll_interval_ms)?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), QueueError> {
        if self.workers == 0 {
            return Err(QueueError::validation("workers must be at least 1"));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T, QueueError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| QueueError::validation(format!("{key}={raw:?}: {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let queue = QueueConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(queue.simulated_latency(), Duration::ZERO);

        let worker = WorkerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(worker, WorkerConfig::default());
    }

    #[test]
    fn values_are_read_from_lookup() {
        let queue = QueueConfig::from_lookup(lookup(&[(ENV_SIMULATED_LATENCY_MS, "100")])).unwrap();
        assert_eq!(queue.simulated_latency(), Duration::from_millis(100));

        let worker = WorkerConfig::from_lookup(lookup(&[
            (ENV_WORKERS, "4"),
            (ENV_POLL_INTERVAL_MS, " 25 "),
        ]))
        .unwrap();
        assert_eq!(worker.workers, 4);
        assert_eq!(worker.poll_interval(), Duration::from_millis(25));
    }

    #[test]
    fn malformed_values_are_validation_errors() {
        let err = QueueConfig::from_lookup(lookup(&[(ENV_SIMULATED_LATENCY_MS, "x")])).unwrap_err();
        assert!(matches!(err, QueueError::Validation(msg) if msg.contains(ENV_SIMULATED_LATENCY_MS)));

        let err = WorkerConfig::from_lookup(lookup(&[(ENV_WORKERS, "0")])).unwrap_err();
        assert!(matches!(err, QueueError::Validation(_)));
    }

    #[test]
    fn deserializes_with_defaults() {
        let worker: WorkerConfig = serde_json::from_str(r#"{ "workers": 2 }"#).unwrap();
        assert_eq!(worker.workers, 2);
        assert_eq!(worker.poll_interval_ms, 100);

        let queue: QueueConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(queue, QueueConfig::default());
    }
}

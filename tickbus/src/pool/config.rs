//! Worker pool configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Worker pool configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Workers kept alive for the lifetime of the pool
    #[serde(rename = "core-threads", default = "default_core_threads")]
    pub core_threads: usize,

    /// Hard cap on live workers, core included
    #[serde(rename = "max-threads", default = "default_max_threads")]
    pub max_threads: usize,

    /// How long a worker above the core count may sit idle before exiting
    #[serde(rename = "keep-alive-ms", default = "default_keep_alive_ms")]
    pub keep_alive_ms: u64,

    /// Capacity of the queue holding unstarted jobs
    #[serde(rename = "queue-capacity", default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Prefix for worker thread names
    #[serde(rename = "thread-name", default = "default_thread_name")]
    pub thread_name: String,
}

fn default_core_threads() -> usize {
    3
}

fn default_max_threads() -> usize {
    10
}

fn default_keep_alive_ms() -> u64 {
    1000
}

fn default_queue_capacity() -> usize {
    50
}

fn default_thread_name() -> String {
    "tickbus-worker".to_string()
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            core_threads: default_core_threads(),
            max_threads: default_max_threads(),
            keep_alive_ms: default_keep_alive_ms(),
            queue_capacity: default_queue_capacity(),
            thread_name: default_thread_name(),
        }
    }
}

impl PoolConfig {
    /// Idle timeout for workers above the core count
    pub fn keep_alive(&self) -> Duration {
        Duration::from_millis(self.keep_alive_ms)
    }

    /// Check the limits are coherent
    pub fn validate(&self) -> eyre::Result<()> {
        if self.max_threads == 0 {
            return Err(eyre::eyre!("pool max-threads must be at least 1"));
        }
        if self.core_threads > self.max_threads {
            return Err(eyre::eyre!(
                "pool core-threads ({}) exceeds max-threads ({})",
                self.core_threads,
                self.max_threads
            ));
        }
        if self.queue_capacity == 0 {
            return Err(eyre::eyre!("pool queue-capacity must be at least 1"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PoolConfig::default();
        assert_eq!(config.core_threads, 3);
        assert_eq!(config.max_threads, 10);
        assert_eq!(config.keep_alive_ms, 1000);
        assert_eq!(config.queue_capacity, 50);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_keep_alive_duration() {
        let config = PoolConfig {
            keep_alive_ms: 250,
            ..Default::default()
        };
        assert_eq!(config.keep_alive(), Duration::from_millis(250));
    }

    #[test]
    fn test_validate_rejects_core_above_max() {
        let config = PoolConfig {
            core_threads: 4,
            max_threads: 2,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("core-threads"));
    }

    #[test]
    fn test_validate_rejects_empty_queue() {
        let config = PoolConfig {
            queue_capacity: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: PoolConfig = serde_yaml::from_str("max-threads: 4\n").unwrap();
        assert_eq!(config.max_threads, 4);
        assert_eq!(config.core_threads, 3);
        assert_eq!(config.queue_capacity, 50);
    }
}

//! Tickbus configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::pool::PoolConfig;
use crate::ticker::TickerConfig;

/// Main tickbus configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Worker pool limits
    pub pool: PoolConfig,

    /// Ticker rate
    pub ticker: TickerConfig,
}

impl Config {
    /// Validate configuration before use
    pub fn validate(&self) -> Result<()> {
        self.pool.validate().context("Invalid pool configuration")?;
        self.ticker.validate().context("Invalid ticker configuration")?;
        Ok(())
    }

    /// Load configuration with fallback chain
    ///
    /// Explicit path, then `./.tickbus.yml`, then
    /// `~/.config/tickbus/tickbus.yml`, then defaults. A broken file in the
    /// fallback chain is skipped with a warning; a broken explicit file is an
    /// error.
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        let local_config = PathBuf::from(".tickbus.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("tickbus").join("tickbus.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;
        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;
        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Render as YAML
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Failed to serialize config")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.pool.core_threads, 3);
        assert_eq!(config.pool.max_threads, 10);
        assert_eq!(config.pool.queue_capacity, 50);
        assert_eq!(config.ticker.tick_rate_hz, 30);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_deserialize_config() {
        let yaml = r#"
pool:
  core-threads: 2
  max-threads: 4
  keep-alive-ms: 500
  queue-capacity: 8

ticker:
  tick-rate-hz: 20
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.pool.core_threads, 2);
        assert_eq!(config.pool.max_threads, 4);
        assert_eq!(config.pool.keep_alive_ms, 500);
        assert_eq!(config.pool.queue_capacity, 8);
        assert_eq!(config.ticker.tick_rate_hz, 20);
        assert_eq!(config.ticker.period_ms(), 50);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: Config = serde_yaml::from_str("ticker:\n  tick-rate-hz: 60\n").unwrap();
        assert_eq!(config.ticker.tick_rate_hz, 60);
        assert_eq!(config.pool, PoolConfig::default());
    }

    #[test]
    fn test_validate_reports_section() {
        let config = Config {
            ticker: TickerConfig::with_rate(0),
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(format!("{:#}", err).contains("ticker"));
    }

    #[test]
    fn test_load_explicit_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "pool:\n  max-threads: 6").unwrap();

        let config = Config::load(Some(&file.path().to_path_buf())).unwrap();
        assert_eq!(config.pool.max_threads, 6);
        assert_eq!(config.ticker.tick_rate_hz, 30);
    }

    #[test]
    fn test_load_missing_explicit_file_fails() {
        let path = PathBuf::from("/nonexistent/tickbus.yml");
        let err = Config::load(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/tickbus.yml"));
    }

    #[test]
    fn test_yaml_round_trip_keeps_kebab_keys() {
        let yaml = Config::default().to_yaml().unwrap();
        assert!(yaml.contains("core-threads: 3"));
        assert!(yaml.contains("tick-rate-hz: 30"));
    }
}

//! Ticker configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Ticker configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickerConfig {
    /// Nominal loop frequency
    #[serde(rename = "tick-rate-hz", default = "default_tick_rate_hz")]
    pub tick_rate_hz: u32,

    /// Name recorded on the loop's log span
    #[serde(default = "default_name")]
    pub name: String,
}

fn default_tick_rate_hz() -> u32 {
    30
}

fn default_name() -> String {
    "ticker".to_string()
}

impl Default for TickerConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: default_tick_rate_hz(),
            name: default_name(),
        }
    }
}

impl TickerConfig {
    /// Create a config for the given rate with the default name
    pub fn with_rate(tick_rate_hz: u32) -> Self {
        Self {
            tick_rate_hz,
            ..Default::default()
        }
    }

    /// Nominal period in whole milliseconds (`1000 / rate`, truncated)
    pub fn period_ms(&self) -> u64 {
        1000 / u64::from(self.tick_rate_hz.max(1))
    }

    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms())
    }

    /// Check the rate yields a period of at least one millisecond
    pub fn validate(&self) -> eyre::Result<()> {
        if self.tick_rate_hz == 0 {
            return Err(eyre::eyre!("ticker tick-rate-hz must be at least 1"));
        }
        if self.tick_rate_hz > 1000 {
            return Err(eyre::eyre!(
                "ticker tick-rate-hz ({}) exceeds 1000; period would be under 1ms",
                self.tick_rate_hz
            ));
        }
        Ok(())
    }
}

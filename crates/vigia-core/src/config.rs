//! Engine configuration.
//!
//! Configuration is validated at load time, with sensible defaults and
//! clear error messages. The embedding application supplies the sampling
//! cadence and an optional CPU clamp; everything else is derived.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{EngineError, Result};

/// Minimum accepted sampling interval. Anything shorter produces CPU
/// deltas dominated by clock-tick granularity.
pub const MIN_SAMPLE_INTERVAL: Duration = Duration::from_millis(100);

/// Configuration for a monitor engine instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Sampling cadence of the collection loop.
    #[serde(default = "default_sample_interval")]
    #[serde(with = "humantime_serde")]
    pub sample_interval: Duration,

    /// Upper bound for one process's CPU percentage. `None` resolves to
    /// `100 × logical core count` at engine start.
    #[serde(default)]
    pub cpu_clamp_percent: Option<f64>,

    /// Capacity of the publish/error observer channels. Lagging observers
    /// miss snapshots; they never block the loop.
    #[serde(default = "default_observer_capacity")]
    pub observer_capacity: usize,
}

fn default_sample_interval() -> Duration {
    Duration::from_secs(2)
}

fn default_observer_capacity() -> usize {
    16
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            sample_interval: default_sample_interval(),
            cpu_clamp_percent: None,
            observer_capacity: default_observer_capacity(),
        }
    }
}

impl MonitorConfig {
    /// Creates a configuration with the given sampling interval.
    #[must_use]
    pub fn with_interval(sample_interval: Duration) -> Self {
        Self {
            sample_interval,
            ..Self::default()
        }
    }

    /// Validates the configuration.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<()> {
        if self.sample_interval < MIN_SAMPLE_INTERVAL {
            return Err(EngineError::config(format!(
                "sample_interval must be at least {}ms",
                MIN_SAMPLE_INTERVAL.as_millis()
            )));
        }
        if let Some(clamp) = self.cpu_clamp_percent {
            if !clamp.is_finite() || clamp <= 0.0 {
                return Err(EngineError::config(
                    "cpu_clamp_percent must be positive and finite",
                ));
            }
        }
        if self.observer_capacity == 0 {
            return Err(EngineError::config(
                "observer_capacity must be greater than 0",
            ));
        }
        Ok(())
    }

    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| EngineError::config(format!("failed to read config: {e}")))?;
        Self::from_toml(&content)
    }

    /// Parses configuration from a TOML string.
    ///
    /// # Errors
    /// Returns an error if the string cannot be parsed or is invalid.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| EngineError::config(format!("failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Resolves the CPU clamp bound against the logical core count.
    #[must_use]
    pub fn resolved_cpu_clamp(&self) -> f64 {
        self.cpu_clamp_percent
            .unwrap_or_else(|| 100.0 * logical_cores() as f64)
    }
}

/// Number of logical cores, at least 1.
#[must_use]
pub fn logical_cores() -> usize {
    std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get)
}

/// Serde helper for humantime durations.
mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    /// Serializes a duration as a human-readable string.
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    /// Deserializes a duration from a human-readable string.
    ///
    /// # Errors
    /// Returns an error if the string cannot be parsed.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}

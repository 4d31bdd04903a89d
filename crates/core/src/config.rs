//! Configuration for the coordinator and the simulated endpoint.
//!
//! Loaded from TOML. Every field has a default, so an empty file (or a missing
//! section) yields the stock configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Retries allowed after the first attempt (up to four endpoint calls total).
pub const MAX_RETRIES: u32 = 3;

/// Fixed delay between attempts.
pub const RETRY_DELAY: Duration = Duration::from_secs(2);

const RATE_TOLERANCE: f64 = 1e-6;

/// Upper bound on the configurable retry budget.
const RETRY_LIMIT: u32 = 10;

/// Upper bound on the configurable delay between attempts.
const RETRY_DELAY_LIMIT_MS: u64 = 60_000;

/// Top-level configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TallyConfig {
    #[serde(default)]
    pub endpoint: EndpointConfig,

    #[serde(default)]
    pub coordinator: CoordinatorConfig,
}

impl TallyConfig {
    /// Parse configuration from a TOML string and validate it.
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigParse` on malformed TOML and
    /// `Error::InvalidConfig` if validation fails.
    pub fn from_toml_str(input: &str) -> Result<Self> {
        let config: Self = toml::from_str(input).map_err(|e| Error::config_parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a configuration file.
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigRead` if the file cannot be read, otherwise the
    /// errors of [`TallyConfig::from_toml_str`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents =
            std::fs::read_to_string(path).map_err(|e| Error::config_read(path, e.to_string()))?;
        Self::from_toml_str(&contents)
    }

    /// Validate both sections.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` describing the first violation.
    pub fn validate(&self) -> Result<()> {
        self.endpoint.validate()?;
        self.coordinator.validate()
    }
}

/// Failure distribution of the simulated endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// Fraction of calls that succeed immediately.
    #[serde(default = "default_success_rate")]
    pub success_rate: f64,

    /// Fraction of calls that return a temporary failure (503).
    #[serde(default = "default_failure_rate")]
    pub failure_rate: f64,

    /// Fraction of calls that succeed after a random delay.
    #[serde(default = "default_delayed_rate")]
    pub delayed_rate: f64,

    /// Lower bound of the delayed-success wait.
    #[serde(default = "default_min_delay_ms")]
    pub min_delay_ms: u64,

    /// Upper bound of the delayed-success wait.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            success_rate: default_success_rate(),
            failure_rate: default_failure_rate(),
            delayed_rate: default_delayed_rate(),
            min_delay_ms: default_min_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl EndpointConfig {
    /// Validate the rates and delay bounds.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` if a rate is outside `[0, 1]`, the rates
    /// do not sum to 1.0, or `min_delay_ms > max_delay_ms`.
    pub fn validate(&self) -> Result<()> {
        let rates = [
            ("success_rate", self.success_rate),
            ("failure_rate", self.failure_rate),
            ("delayed_rate", self.delayed_rate),
        ];

        if let Some((name, value)) = rates
            .iter()
            .find(|(_, value)| !(0.0..=1.0).contains(value))
        {
            return Err(Error::invalid_config(format!(
                "{name} must be within [0, 1], got {value}"
            )));
        }

        let sum: f64 = rates.iter().map(|(_, value)| value).sum();
        if (sum - 1.0).abs() > RATE_TOLERANCE {
            return Err(Error::invalid_config(format!(
                "endpoint rates must sum to 1.0, got {sum}"
            )));
        }

        if self.min_delay_ms > self.max_delay_ms {
            return Err(Error::invalid_config(format!(
                "min_delay_ms ({}) exceeds max_delay_ms ({})",
                self.min_delay_ms, self.max_delay_ms
            )));
        }

        Ok(())
    }

    pub const fn min_delay(&self) -> Duration {
        Duration::from_millis(self.min_delay_ms)
    }

    pub const fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

/// Retry budget of the submission coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

impl CoordinatorConfig {
    /// Validate the retry budget.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` if `max_retries` exceeds 10 or
    /// `retry_delay_ms` exceeds one minute.
    pub fn validate(&self) -> Result<()> {
        if self.max_retries > RETRY_LIMIT {
            return Err(Error::invalid_config(format!(
                "max_retries must be at most {RETRY_LIMIT}, got {}",
                self.max_retries
            )));
        }

        if self.retry_delay_ms > RETRY_DELAY_LIMIT_MS {
            return Err(Error::invalid_config(format!(
                "retry_delay_ms must be at most {RETRY_DELAY_LIMIT_MS}, got {}",
                self.retry_delay_ms
            )));
        }

        Ok(())
    }

    pub const fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

const fn default_success_rate() -> f64 {
    0.4
}

const fn default_failure_rate() -> f64 {
    0.3
}

const fn default_delayed_rate() -> f64 {
    0.3
}

const fn default_min_delay_ms() -> u64 {
    5_000
}

const fn default_max_delay_ms() -> u64 {
    10_000
}

const fn default_max_retries() -> u32 {
    MAX_RETRIES
}

#[allow(clippy::cast_possible_truncation)]
const fn default_retry_delay_ms() -> u64 {
    RETRY_DELAY.as_millis() as u64
}

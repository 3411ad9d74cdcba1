//! Engine configuration.
//!
//! Every field has a default, so an empty TOML document is a valid config.
//! String values may reference environment variables as `${NAME}`.

use crate::breaker::CircuitBreakerConfig;
use crate::errors::ConfigError;
use crate::executor::RetryPolicy;
use crate::runs::RunOptions;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Defaults applied to executors and runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum dispatch attempts per node.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Delay before the first retry, in seconds.
    #[serde(default = "default_backoff_base")]
    pub backoff_base_seconds: f64,
    /// Upper bound on any retry delay, in seconds.
    #[serde(default = "default_backoff_max")]
    pub backoff_max_seconds: f64,
    /// Absolute deadline for a run, in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: f64,
    /// Consecutive failures that open a node's breaker.
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
    /// How long an open breaker waits before a trial call, in seconds.
    #[serde(default = "default_recovery_timeout")]
    pub recovery_timeout_seconds: f64,
}

fn default_max_retries() -> u32 {
    3
}

fn default_backoff_base() -> f64 {
    1.0
}

fn default_backoff_max() -> f64 {
    60.0
}

fn default_timeout() -> f64 {
    3600.0
}

fn default_failure_threshold() -> u32 {
    5
}

fn default_recovery_timeout() -> f64 {
    60.0
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            backoff_base_seconds: default_backoff_base(),
            backoff_max_seconds: default_backoff_max(),
            timeout_seconds: default_timeout(),
            failure_threshold: default_failure_threshold(),
            recovery_timeout_seconds: default_recovery_timeout(),
        }
    }
}

impl EngineConfig {
    /// Creates a config with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses and validates a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(&expand_env_vars(text))
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::NotFound {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Checks that every duration is finite and non-negative and that the
    /// backoff cap is not below the base.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("backoff_base_seconds", self.backoff_base_seconds),
            ("backoff_max_seconds", self.backoff_max_seconds),
            ("timeout_seconds", self.timeout_seconds),
            ("recovery_timeout_seconds", self.recovery_timeout_seconds),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be a non-negative number, got {value}"
                )));
            }
        }
        if self.backoff_max_seconds < self.backoff_base_seconds {
            return Err(ConfigError::Invalid(format!(
                "backoff_max_seconds ({}) is below backoff_base_seconds ({})",
                self.backoff_max_seconds, self.backoff_base_seconds
            )));
        }
        Ok(())
    }

    /// Sets the retry count.
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Sets the backoff base and cap.
    #[must_use]
    pub fn with_backoff(mut self, base_seconds: f64, max_seconds: f64) -> Self {
        self.backoff_base_seconds = base_seconds;
        self.backoff_max_seconds = max_seconds;
        self
    }

    /// Sets the run deadline.
    #[must_use]
    pub fn with_timeout(mut self, seconds: f64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    /// Sets the breaker threshold.
    #[must_use]
    pub fn with_failure_threshold(mut self, failure_threshold: u32) -> Self {
        self.failure_threshold = failure_threshold;
        self
    }

    /// Sets the breaker recovery timeout.
    #[must_use]
    pub fn with_recovery_timeout(mut self, seconds: f64) -> Self {
        self.recovery_timeout_seconds = seconds;
        self
    }

    /// Builds the retry policy.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_retries,
            seconds(self.backoff_base_seconds),
            seconds(self.backoff_max_seconds),
        )
    }

    /// Builds the breaker defaults.
    #[must_use]
    pub fn breaker_config(&self) -> CircuitBreakerConfig {
        CircuitBreakerConfig::new(self.failure_threshold, seconds(self.recovery_timeout_seconds))
    }

    /// Builds run options with no trigger data.
    #[must_use]
    pub fn run_options(&self) -> RunOptions {
        RunOptions::new()
            .with_timeout(seconds(self.timeout_seconds))
            .with_retry(self.retry_policy())
    }
}

// Invalid values only reach here when `validate` was skipped.
fn seconds(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(Duration::ZERO)
}

/// Replaces `${NAME}` with the value of the environment variable `NAME`.
/// Unset variables are left as written.
fn expand_env_vars(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' || chars.peek() != Some(&'{') {
            result.push(c);
            continue;
        }
        chars.next();
        let name: String = chars.by_ref().take_while(|c| *c != '}').collect();
        match std::env::var(&name) {
            Ok(value) => result.push_str(&value),
            Err(_) => {
                result.push_str("${");
                result.push_str(&name);
                result.push('}');
            }
        }
    }
    result
}

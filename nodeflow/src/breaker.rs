//! Per-node circuit breaker.
//!
//! A breaker opens after `failure_threshold` consecutive failures and stays
//! open for `recovery_timeout`. The first `can_execute` call after that moves
//! it to half-open and lets one probe through; the probe's outcome closes or
//! re-opens it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Calls go through.
    Closed,
    /// Calls are rejected until the recovery timeout has elapsed.
    Open,
    /// One probe call is allowed.
    HalfOpen,
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed => write!(f, "closed"),
            Self::Open => write!(f, "open"),
            Self::HalfOpen => write!(f, "half_open"),
        }
    }
}

/// Breaker thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
    /// Failures that open the breaker.
    pub failure_threshold: u32,
    /// Time the breaker stays open before a probe is allowed.
    pub recovery_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(60),
        }
    }
}

impl CircuitBreakerConfig {
    /// Creates a config.
    #[must_use]
    pub fn new(failure_threshold: u32, recovery_timeout: Duration) -> Self {
        Self {
            failure_threshold,
            recovery_timeout,
        }
    }

    /// Sets the failure threshold.
    #[must_use]
    pub fn with_failure_threshold(mut self, failure_threshold: u32) -> Self {
        self.failure_threshold = failure_threshold;
        self
    }

    /// Sets the recovery timeout.
    #[must_use]
    pub fn with_recovery_timeout(mut self, recovery_timeout: Duration) -> Self {
        self.recovery_timeout = recovery_timeout;
        self
    }
}

/// Closed/open/half-open failure gate for a single node.
#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    state: CircuitState,
    failure_count: u32,
    last_failure_time: Option<Instant>,
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }
}

impl CircuitBreaker {
    /// Creates a closed breaker.
    #[must_use]
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            state: CircuitState::Closed,
            failure_count: 0,
            last_failure_time: None,
        }
    }

    /// Returns whether a call may proceed, moving an expired open breaker to
    /// half-open.
    pub fn can_execute(&mut self) -> bool {
        match self.state {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let expired = self
                    .last_failure_time
                    .map_or(true, |at| at.elapsed() >= self.config.recovery_timeout);
                if expired {
                    debug!("Circuit breaker entering half-open state");
                    self.state = CircuitState::HalfOpen;
                }
                expired
            }
        }
    }

    /// Records a successful call.
    pub fn record_success(&mut self) {
        self.failure_count = 0;
        self.state = CircuitState::Closed;
    }

    /// Records a failed call.
    pub fn record_failure(&mut self) {
        self.failure_count = self.failure_count.saturating_add(1);
        self.last_failure_time = Some(Instant::now());

        if self.state == CircuitState::HalfOpen {
            warn!("Circuit breaker probe failed, re-opening");
            self.state = CircuitState::Open;
        } else if self.failure_count >= self.config.failure_threshold {
            if self.state != CircuitState::Open {
                warn!(
                    failures = self.failure_count,
                    "Circuit breaker opened"
                );
            }
            self.state = CircuitState::Open;
        }
    }

    /// Returns true while the breaker rejects calls.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state == CircuitState::Open
    }

    /// Returns the current state without attempting a transition.
    #[must_use]
    pub fn state(&self) -> CircuitState {
        self.state
    }

    /// Returns the failure count since the last success.
    #[must_use]
    pub fn failure_count(&self) -> u32 {
        self.failure_count
    }

    /// Returns the breaker config.
    #[must_use]
    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker(threshold: u32, recovery_ms: u64) -> CircuitBreaker {
        CircuitBreaker::new(CircuitBreakerConfig::new(
            threshold,
            Duration::from_millis(recovery_ms),
        ))
    }

    #[test]
    fn test_defaults() {
        let breaker = CircuitBreaker::default();
        assert_eq!(breaker.config().failure_threshold, 5);
        assert_eq!(breaker.config().recovery_timeout, Duration::from_secs(60));
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[test]
    fn test_opens_at_threshold() {
        let mut breaker = breaker(3, 60_000);
        breaker.record_failure();
        breaker.record_failure();
        assert!(breaker.can_execute());

        breaker.record_failure();
        assert!(breaker.is_open());
        assert!(!breaker.can_execute());
        assert_eq!(breaker.failure_count(), 3);
    }

    #[test]
    fn test_success_resets() {
        let mut breaker = breaker(2, 60_000);
        breaker.record_failure();
        breaker.record_success();
        breaker.record_failure();

        assert_eq!(breaker.state(), CircuitState::Closed);
        assert_eq!(breaker.failure_count(), 1);
    }

    #[test]
    fn test_half_open_after_recovery() {
        let mut breaker = breaker(1, 100);
        breaker.record_failure();
        assert!(!breaker.can_execute());

        std::thread::sleep(Duration::from_millis(150));
        assert!(breaker.can_execute());
        assert_eq!(breaker.state(), CircuitState::HalfOpen);

        breaker.record_success();
        assert_eq!(breaker.state(), CircuitState::Closed);
        assert_eq!(breaker.failure_count(), 0);
    }

    #[test]
    fn test_half_open_failure_reopens() {
        let mut breaker = breaker(1, 100);
        breaker.record_failure();
        std::thread::sleep(Duration::from_millis(150));
        assert!(breaker.can_execute());

        breaker.record_failure();
        assert!(breaker.is_open());
        assert!(!breaker.can_execute());
    }

    #[test]
    fn test_state_display() {
        assert_eq!(CircuitState::HalfOpen.to_string(), "half_open");
        assert_eq!(CircuitState::Open.to_string(), "open");
    }
}

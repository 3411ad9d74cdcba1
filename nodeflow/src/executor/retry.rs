//! Retry policy with exponential backoff.

use crate::errors::NodeError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// How often and how patiently a failing node is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum dispatch attempts per node. Zero behaves like one.
    pub max_retries: u32,
    /// Delay before the first retry. Doubles with every further retry.
    pub backoff_base: Duration,
    /// Upper bound on any single delay.
    pub backoff_max: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_base: Duration::from_secs(1),
            backoff_max: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// Creates a policy.
    #[must_use]
    pub fn new(max_retries: u32, backoff_base: Duration, backoff_max: Duration) -> Self {
        Self {
            max_retries,
            backoff_base,
            backoff_max,
        }
    }

    /// A policy that dispatches each node exactly once.
    #[must_use]
    pub fn no_retry() -> Self {
        Self::new(1, Duration::ZERO, Duration::ZERO)
    }

    /// Sets the maximum attempts.
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Sets the base delay.
    #[must_use]
    pub fn with_backoff_base(mut self, backoff_base: Duration) -> Self {
        self.backoff_base = backoff_base;
        self
    }

    /// Sets the delay cap.
    #[must_use]
    pub fn with_backoff_max(mut self, backoff_max: Duration) -> Self {
        self.backoff_max = backoff_max;
        self
    }

    /// Returns the number of dispatch attempts allowed.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.max(1)
    }

    /// Returns the delay before retry number `retry` (zero-based):
    /// `backoff_base * 2^retry`, capped at `backoff_max`.
    #[must_use]
    pub fn delay_for(&self, retry: u32) -> Duration {
        self.backoff_base
            .saturating_mul(2u32.saturating_pow(retry))
            .min(self.backoff_max)
    }

    /// Returns the delay to wait after `failed_attempts` retryable failures,
    /// or `None` once the attempt budget is spent.
    #[must_use]
    pub fn next_delay(&self, failed_attempts: u32) -> Option<Duration> {
        if failed_attempts == 0 || failed_attempts >= self.max_attempts() {
            None
        } else {
            Some(self.delay_for(failed_attempts - 1))
        }
    }
}

/// How a node's dispatch loop ended.
#[derive(Debug, Clone, PartialEq)]
pub enum RetryOutcome {
    /// An attempt produced an output.
    Succeeded {
        /// The node output.
        output: Value,
        /// Retryable failures before the success.
        failed_attempts: u32,
    },
    /// Every attempt failed with a retryable error.
    Exhausted {
        /// The error of the last attempt.
        error: NodeError,
    },
    /// An attempt failed with an error that is not retried.
    Rejected {
        /// The error.
        error: NodeError,
        /// Retryable failures before this one.
        failed_attempts: u32,
    },
    /// The run was cancelled during an attempt or a backoff wait.
    Cancelled {
        /// Retryable failures before cancellation.
        failed_attempts: u32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.backoff_base, Duration::from_secs(1));
        assert_eq!(policy.backoff_max, Duration::from_secs(60));
    }

    #[test]
    fn test_exponential_delays_capped() {
        let policy = RetryPolicy::new(10, Duration::from_millis(100), Duration::from_millis(500));

        assert_eq!(policy.delay_for(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for(2), Duration::from_millis(400));
        assert_eq!(policy.delay_for(3), Duration::from_millis(500));
        assert_eq!(policy.delay_for(40), Duration::from_millis(500));
    }

    #[test]
    fn test_next_delay_respects_budget() {
        let policy = RetryPolicy::new(3, Duration::from_millis(10), Duration::from_secs(1));

        assert_eq!(policy.next_delay(1), Some(Duration::from_millis(10)));
        assert_eq!(policy.next_delay(2), Some(Duration::from_millis(20)));
        assert_eq!(policy.next_delay(3), None);
    }

    #[test]
    fn test_zero_retries_means_one_attempt() {
        let policy = RetryPolicy::default().with_max_retries(0);
        assert_eq!(policy.max_attempts(), 1);
        assert_eq!(policy.next_delay(1), None);
        assert_eq!(RetryPolicy::no_retry().max_attempts(), 1);
    }
}

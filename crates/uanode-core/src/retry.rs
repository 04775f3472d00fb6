// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Exponential backoff for connection attempts.
//!
//! A [`ConnectionStrategy`] bounds how often and how patiently a client
//! retries. [`BackoffState`] is the per-connection attempt state driven by
//! it: the attempt count, the next delay and the last error.
//!
//! With `max_retry = 3`, `initial_delay = 1s` and `max_delay = 5s`, a
//! transport that always fails sees three attempts separated by 1s and 2s,
//! after which the state reports exhaustion.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use uanode_core::retry::{BackoffState, ConnectionStrategy, RetryDecision};
//!
//! let strategy = ConnectionStrategy::new(3, Duration::from_secs(1), Duration::from_secs(5));
//! let mut state = BackoffState::new(strategy);
//!
//! assert_eq!(state.record_failure("refused"), RetryDecision::Retry(Duration::from_secs(1)));
//! assert_eq!(state.record_failure("refused"), RetryDecision::Retry(Duration::from_secs(2)));
//! assert_eq!(state.record_failure("refused"), RetryDecision::GiveUp);
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::humantime_serde;

// =============================================================================
// ConnectionStrategy
// =============================================================================

/// Retry bounds for establishing a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionStrategy {
    /// Total number of attempts, including the first.
    #[serde(default = "default_max_retry")]
    pub max_retry: u32,

    /// Delay after the first failed attempt.
    #[serde(default = "default_initial_delay", with = "humantime_serde")]
    pub initial_delay: Duration,

    /// Upper bound for any delay.
    #[serde(default = "default_max_delay", with = "humantime_serde")]
    pub max_delay: Duration,
}

fn default_max_retry() -> u32 {
    3
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(5)
}

impl Default for ConnectionStrategy {
    fn default() -> Self {
        Self {
            max_retry: default_max_retry(),
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
        }
    }
}

impl ConnectionStrategy {
    /// Creates a strategy.
    pub const fn new(max_retry: u32, initial_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_retry,
            initial_delay,
            max_delay,
        }
    }

    /// A single attempt with no retries.
    pub const fn no_retry() -> Self {
        Self::new(1, Duration::ZERO, Duration::ZERO)
    }

    /// Delay to wait after the `failed_attempts`-th failure (1-based):
    /// `min(initial_delay * 2^(failed_attempts - 1), max_delay)`.
    pub fn delay_for(&self, failed_attempts: u32) -> Duration {
        let exponent = failed_attempts.saturating_sub(1).min(31);
        let factor = 2u32.saturating_pow(exponent);
        self.initial_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Returns a description of the first invalid bound, if any.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_retry == 0 {
            return Err("max_retry must be at least 1".to_string());
        }
        if self.initial_delay > self.max_delay {
            return Err(format!(
                "initial_delay ({:?}) exceeds max_delay ({:?})",
                self.initial_delay, self.max_delay
            ));
        }
        Ok(())
    }
}

// =============================================================================
// BackoffState
// =============================================================================

/// What to do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Wait this long, then try again.
    Retry(Duration),
    /// Every allowed attempt has failed.
    GiveUp,
}

/// Attempt state of one connection.
#[derive(Debug, Clone)]
pub struct BackoffState {
    strategy: ConnectionStrategy,
    failed_attempts: u32,
    last_error: Option<String>,
}

impl BackoffState {
    /// Creates a fresh state.
    pub fn new(strategy: ConnectionStrategy) -> Self {
        Self {
            strategy,
            failed_attempts: 0,
            last_error: None,
        }
    }

    /// Returns the strategy.
    pub fn strategy(&self) -> &ConnectionStrategy {
        &self.strategy
    }

    /// Returns the number of failed attempts since the last reset.
    pub fn failed_attempts(&self) -> u32 {
        self.failed_attempts
    }

    /// Returns the message of the last failure.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Returns the delay that the next failure would produce.
    pub fn next_delay(&self) -> Duration {
        self.strategy.delay_for(self.failed_attempts + 1)
    }

    /// Records a failure and decides whether to retry.
    pub fn record_failure(&mut self, error: impl Into<String>) -> RetryDecision {
        self.failed_attempts += 1;
        self.last_error = Some(error.into());
        if self.failed_attempts >= self.strategy.max_retry {
            RetryDecision::GiveUp
        } else {
            RetryDecision::Retry(self.strategy.delay_for(self.failed_attempts))
        }
    }

    /// Clears the state after a successful connection.
    pub fn reset(&mut self) {
        self.failed_attempts = 0;
        self.last_error = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strategy() -> ConnectionStrategy {
        ConnectionStrategy::new(3, Duration::from_millis(1000), Duration::from_millis(5000))
    }

    #[test]
    fn test_delay_doubles_up_to_cap() {
        let s = ConnectionStrategy::new(10, Duration::from_millis(1000), Duration::from_millis(5000));
        let delays: Vec<_> = (1..=5).map(|n| s.delay_for(n).as_millis()).collect();
        assert_eq!(delays, [1000, 2000, 4000, 5000, 5000]);
    }

    #[test]
    fn test_delay_does_not_overflow() {
        let s = ConnectionStrategy::new(100, Duration::from_secs(1), Duration::from_secs(60));
        assert_eq!(s.delay_for(u32::MAX), Duration::from_secs(60));
    }

    #[test]
    fn test_three_attempts_then_give_up() {
        let mut state = BackoffState::new(strategy());
        assert_eq!(
            state.record_failure("e1"),
            RetryDecision::Retry(Duration::from_millis(1000))
        );
        assert_eq!(
            state.record_failure("e2"),
            RetryDecision::Retry(Duration::from_millis(2000))
        );
        assert_eq!(state.record_failure("e3"), RetryDecision::GiveUp);
        assert_eq!(state.failed_attempts(), 3);
        assert_eq!(state.last_error(), Some("e3"));
    }

    #[test]
    fn test_reset() {
        let mut state = BackoffState::new(strategy());
        state.record_failure("e1");
        state.reset();
        assert_eq!(state.failed_attempts(), 0);
        assert_eq!(state.last_error(), None);
        assert_eq!(state.next_delay(), Duration::from_millis(1000));
    }

    #[test]
    fn test_validate() {
        assert!(strategy().validate().is_ok());
        assert!(ConnectionStrategy::new(0, Duration::ZERO, Duration::ZERO)
            .validate()
            .is_err());
        assert!(
            ConnectionStrategy::new(3, Duration::from_secs(10), Duration::from_secs(1))
                .validate()
                .is_err()
        );
    }

    #[test]
    fn test_no_retry() {
        let mut state = BackoffState::new(ConnectionStrategy::no_retry());
        assert_eq!(state.record_failure("down"), RetryDecision::GiveUp);
    }

    #[test]
    fn test_serde_humantime() {
        let s: ConnectionStrategy =
            serde_json::from_str(r#"{"max_retry":5,"initial_delay":"500ms","max_delay":"10s"}"#)
                .unwrap();
        assert_eq!(s.max_retry, 5);
        assert_eq!(s.initial_delay, Duration::from_millis(500));
        assert_eq!(s.max_delay, Duration::from_secs(10));
    }
}

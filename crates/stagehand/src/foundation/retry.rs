//! Bounded retry for collaborator calls
//!
//! Asset loads and save loads get a small fixed number of attempts with a
//! short pause in between before a failure is treated as fatal.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How many times to attempt an operation and how long to wait in between
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    /// Pause between attempts in milliseconds
    pub delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            delay_ms: 750,
        }
    }
}

impl RetryPolicy {
    /// A policy that tries exactly once
    pub const fn none() -> Self {
        Self {
            max_attempts: 1,
            delay_ms: 0,
        }
    }

    /// Builder: set the attempt count (at least one)
    #[must_use]
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Builder: set the pause between attempts
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Pause between attempts
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    /// Run `op` until it succeeds or the attempts are used up.
    ///
    /// `op` receives the 1-based attempt number. The last error is returned.
    pub fn run<T, E, F>(&self, mut op: F) -> Result<T, E>
    where
        E: std::fmt::Display,
        F: FnMut(u32) -> Result<T, E>,
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op(attempt) {
                Ok(value) => return Ok(value),
                Err(err) if attempt < attempts => {
                    log::warn!("Attempt {attempt}/{attempts} failed: {err}; retrying");
                    if !self.delay().is_zero() {
                        std::thread::sleep(self.delay());
                    }
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_succeeds_after_retry() {
        let policy = RetryPolicy::default().with_delay(Duration::ZERO);
        let mut calls = 0;
        let result: Result<u32, String> = policy.run(|attempt| {
            calls += 1;
            if attempt == 1 { Err("flaky".to_string()) } else { Ok(attempt) }
        });
        assert_eq!(result, Ok(2));
        assert_eq!(calls, 2);
    }

    #[test]
    fn test_gives_up_after_max_attempts() {
        let policy = RetryPolicy::default()
            .with_max_attempts(3)
            .with_delay(Duration::ZERO);
        let mut calls = 0;
        let result: Result<(), String> = policy.run(|attempt| {
            calls += 1;
            Err(format!("failure {attempt}"))
        });
        assert_eq!(result, Err("failure 3".to_string()));
        assert_eq!(calls, 3);
    }

    #[test]
    fn test_none_policy_tries_once() {
        let mut calls = 0;
        let _: Result<(), &str> = RetryPolicy::none().run(|_| {
            calls += 1;
            Err("nope")
        });
        assert_eq!(calls, 1);
    }
}

//! Bounded retry with exponential backoff around remote calls.
//!
//! The delay before retry `k` (1-based) is `base_delay · multiplier^(k-1)`, capped at
//! `max_delay`. Only [`AttemptError::Transient`] failures are retried; a
//! [`AttemptError::Fatal`] failure is returned immediately.
use std::{thread, time::Duration};

use log::{debug, warn};

use crate::treemetrics_errors::TreeMetricsError;

/// Outcome of one failed attempt.
#[derive(Debug)]
pub enum AttemptError {
    /// Network failure, throttling or server error: worth trying again.
    Transient(String),
    /// Anything retrying cannot fix (client error, undecodable payload, …).
    Fatal(TreeMetricsError),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub multiplier: f64,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            multiplier: 2.0,
            max_delay: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    /// A policy that never waits between attempts.
    pub fn immediate(max_attempts: u32) -> Self {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::ZERO,
            multiplier: 1.0,
            max_delay: Duration::ZERO,
        }
    }

    /// Delay slept before retry number `retry` (1 for the first retry).
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = self.multiplier.powi(retry.saturating_sub(1) as i32);
        let secs = self.base_delay.as_secs_f64() * factor;
        if !secs.is_finite() || secs >= self.max_delay.as_secs_f64() {
            self.max_delay
        } else {
            Duration::from_secs_f64(secs)
        }
    }

    /// Run `op` until it succeeds, fails fatally, or the attempts are exhausted.
    ///
    /// Arguments
    /// -----------------
    /// * `what`: Short label of the remote operation, used in logs and in the final error.
    /// * `op`: The attempt, called with the 1-based attempt number.
    ///
    /// Return
    /// ----------
    /// * The first successful value, the fatal error as is, or
    ///   [`TreeMetricsError::RemoteQuery`] carrying the last transient message.
    pub fn run<T>(
        &self,
        what: &str,
        mut op: impl FnMut(u32) -> Result<T, AttemptError>,
    ) -> Result<T, TreeMetricsError> {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            debug!("{what}: attempt {attempt} of {max_attempts}");
            match op(attempt) {
                Ok(value) => return Ok(value),
                Err(AttemptError::Fatal(err)) => return Err(err),
                Err(AttemptError::Transient(message)) => {
                    if attempt >= max_attempts {
                        return Err(TreeMetricsError::RemoteQuery {
                            attempts: attempt,
                            message: format!("{what}: {message}"),
                        });
                    }
                    let delay = self.delay_for(attempt);
                    warn!("{what}: attempt {attempt} failed ({message}), retrying in {delay:?}");
                    thread::sleep(delay);
                    attempt += 1;
                }
            }
        }
    }
}

//! Retry policy for rate-limited fetches.
//!
//! The attempt/backoff progression is explicit state so the HTTP
//! adapter stays a thin driver and the schedule can be asserted in
//! tests without real timers.

use std::time::Duration;

/// Attempts allowed per request before the fetch is terminal.
pub const MAX_ATTEMPTS: u32 = 5;

/// First backoff delay; doubles each retry.
pub const BASE_DELAY_MS: u64 = 700;

/// Where a fetch stands after a rate-limited response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    /// Sleep `delay`, then issue attempt number `next_attempt`.
    BackingOff { next_attempt: u32, delay: Duration },
    /// Retries exhausted; the fetch fails with the last cause.
    Failed { attempts: u32 },
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: MAX_ATTEMPTS,
            base_delay: Duration::from_millis(BASE_DELAY_MS),
        }
    }
}

impl RetryPolicy {
    /// Resolve a rate-limit signal observed on `attempt` (1-based).
    ///
    /// The delay is `base * 2^(attempt-1)`; a server-supplied
    /// retry-after takes precedence when larger.
    pub fn on_rate_limited(&self, attempt: u32, server_retry_after: Option<Duration>) -> RetryState {
        if attempt >= self.max_attempts {
            return RetryState::Failed { attempts: attempt };
        }
        let exponential = self.base_delay * 2u32.pow(attempt - 1);
        let delay = match server_retry_after {
            Some(hint) if hint > exponential => hint,
            _ => exponential,
        };
        RetryState::BackingOff {
            next_attempt: attempt + 1,
            delay,
        }
    }
}

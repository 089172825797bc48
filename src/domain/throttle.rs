//! Adaptive inter-request throttle.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Ceiling for the ratcheted delay.
pub const MAX_DELAY_MS: u64 = 5_000;

/// Session-scoped minimum delay between outbound API requests.
///
/// Every backoff observed by the fetcher ratchets the delay up; it
/// never decreases for the lifetime of the context. Owned by the
/// history assembler and passed by reference into fetches.
#[derive(Debug, Default)]
pub struct RateLimitContext {
    min_delay_ms: AtomicU64,
}

impl RateLimitContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_delay(&self) -> Duration {
        Duration::from_millis(self.min_delay_ms.load(Ordering::Relaxed))
    }

    /// Raise the minimum delay to the observed backoff, clamped to
    /// [`MAX_DELAY_MS`]. Never lowers it.
    pub fn record_backoff(&self, observed: Duration) {
        let clamped = (observed.as_millis() as u64).min(MAX_DELAY_MS);
        self.min_delay_ms.fetch_max(clamped, Ordering::Relaxed);
    }
}

//! Injectable sleep, so backoff and throttle pauses are observable in
//! tests instead of burning wall-clock time.

use std::time::Duration;

use async_trait::async_trait;

#[async_trait]
pub trait SleepPort: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

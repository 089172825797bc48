//! Real sleeper backed by the tokio timer.

use std::time::Duration;

use async_trait::async_trait;

use crate::ports::sleep_port::SleepPort;

pub struct TokioSleeper;

#[async_trait]
impl SleepPort for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

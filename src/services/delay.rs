use std::time::Duration;

use async_trait::async_trait;

/// Source of cancellable timers
///
/// `wait` completes once the duration has elapsed. Dropping the returned
/// future before completion cancels the timer, so a caller racing a timer
/// against another event never leaves a dangling wakeup behind.
#[async_trait]
pub trait Delay: Send + Sync {
    async fn wait(&self, duration: Duration);
}

/// Production timer source backed by the tokio timer wheel
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioDelay;

#[async_trait]
impl Delay for TokioDelay {
    async fn wait(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

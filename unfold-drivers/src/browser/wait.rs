use async_trait::async_trait;
use std::time::Duration;
use tokio::time::sleep;

/// How the engine waits for a page to settle after an action.
///
/// Production uses [`FixedDelay`]; a condition-based poller can be swapped in without
/// touching the trigger logic.
#[async_trait]
pub trait WaitStrategy: Send + Sync {
    async fn settle(&self, pause: Duration);
}

/// Sleep for exactly the requested pause.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedDelay;

#[async_trait]
impl WaitStrategy for FixedDelay {
    async fn settle(&self, pause: Duration) {
        if !pause.is_zero() {
            sleep(pause).await;
        }
    }
}

/// Return immediately. Used with in-memory pages.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDelay;

#[async_trait]
impl WaitStrategy for NoDelay {
    async fn settle(&self, _pause: Duration) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[tokio::test]
    async fn fixed_delay_sleeps() {
        let t0 = Instant::now();
        FixedDelay.settle(Duration::from_millis(20)).await;
        assert!(t0.elapsed() >= Duration::from_millis(20));
    }

    #[tokio::test]
    async fn no_delay_returns_immediately() {
        let t0 = Instant::now();
        NoDelay.settle(Duration::from_secs(5)).await;
        assert!(t0.elapsed() < Duration::from_secs(1));
    }
}

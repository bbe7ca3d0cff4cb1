use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio_util::sync::CancellationToken;

use crate::config::{CollectionMethodSet, CollectorConfig};

/// Run-scoped state threaded through every collaborator call
#[derive(Debug, Clone)]
pub struct CollectionContext {
    pub config: Arc<CollectorConfig>,
    pub methods: CollectionMethodSet,
    pub cancel: CancellationToken,
}

impl CollectionContext {
    pub fn new(config: Arc<CollectorConfig>, methods: CollectionMethodSet) -> Self {
        Self {
            config,
            methods,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Throttle delay with jitter applied, or `None` when throttling is off
    pub fn throttle_delay(&self) -> Option<Duration> {
        let base = self.config.throttle_ms;
        if base == 0 {
            return None;
        }

        let jitter = self.config.jitter_percent.min(100) as u64;
        let spread = base * jitter / 100;
        let millis = if spread == 0 {
            base
        } else {
            rand::rng().random_range(base - spread..=base + spread)
        };
        Some(Duration::from_millis(millis))
    }

    /// Sleep for the throttle delay before a host call.
    ///
    /// Returns early when the run is cancelled.
    pub async fn do_delay(&self) {
        if let Some(delay) = self.throttle_delay() {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = self.cancel.cancelled() => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context_with(throttle_ms: u64, jitter_percent: u8) -> CollectionContext {
        let config = CollectorConfig {
            throttle_ms,
            jitter_percent,
            ..Default::default()
        };
        CollectionContext::new(Arc::new(config), CollectionMethodSet::default_methods())
    }

    #[test]
    fn test_throttle_disabled_by_default() {
        assert!(context_with(0, 50).throttle_delay().is_none());
    }

    #[test]
    fn test_jitter_stays_in_range() {
        let ctx = context_with(100, 20);
        for _ in 0..100 {
            let delay = ctx.throttle_delay().unwrap();
            assert!(delay >= Duration::from_millis(80) && delay <= Duration::from_millis(120));
        }
        assert_eq!(context_with(100, 0).throttle_delay(), Some(Duration::from_millis(100)));
    }

    #[test]
    fn test_no_delay_without_throttle() {
        let ctx = context_with(0, 0);
        let started = std::time::Instant::now();
        tokio_test::block_on(ctx.do_delay());
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_delay_returns_on_cancel() {
        let ctx = context_with(60_000, 0);
        ctx.cancel.cancel();
        tokio::time::timeout(Duration::from_secs(1), ctx.do_delay())
            .await
            .expect("cancelled delay should return immediately");
    }
}

//! Probe rate limiting.
//!
//! A token bucket shared by every task of one executor, so the cap applies
//! to the whole run rather than per worker.

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter as GovLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;

/// Caps probes per second across all tasks that hold a clone.
#[derive(Clone)]
pub struct RateLimiter {
    limiter: Arc<GovLimiter<NotKeyed, InMemoryState, DefaultClock>>,
    rate: u32,
}

impl RateLimiter {
    /// Build a limiter for `rate` probes per second.
    ///
    /// A rate of zero means unlimited and yields `None`.
    pub fn new(rate: u32) -> Option<Self> {
        let per_second = NonZeroU32::new(rate)?;
        Some(Self {
            limiter: Arc::new(GovLimiter::direct(Quota::per_second(per_second))),
            rate,
        })
    }

    /// Wait until the bucket allows another probe.
    pub async fn wait(&self) {
        self.limiter.until_ready().await;
    }

    /// Take a token if one is available right now.
    pub fn try_acquire(&self) -> bool {
        self.limiter.check().is_ok()
    }

    pub fn rate(&self) -> u32 {
        self.rate
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter").field("rate", &self.rate).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};
    use tokio_test::{assert_pending, assert_ready, task};

    #[test]
    fn test_zero_rate_is_unlimited() {
        assert!(RateLimiter::new(0).is_none());
    }

    #[tokio::test]
    async fn test_first_token_immediate() {
        let limiter = RateLimiter::new(100).unwrap();
        assert!(limiter.try_acquire());
        assert_eq!(limiter.rate(), 100);
    }

    #[tokio::test]
    async fn test_clones_share_bucket() {
        let a = RateLimiter::new(1).unwrap();
        let b = a.clone();
        assert!(a.try_acquire());
        assert!(!b.try_acquire());
    }

    #[test]
    fn test_wait_blocks_once_drained() {
        let limiter = RateLimiter::new(1).unwrap();
        assert_ready!(task::spawn(limiter.wait()).poll());

        let mut second = task::spawn(limiter.wait());
        assert_pending!(second.poll());
    }

    #[tokio::test]
    async fn test_wait_paces_probes() {
        let limiter = RateLimiter::new(10).unwrap();
        let start = Instant::now();
        // The bucket starts full, so the last two waits need refills.
        for _ in 0..12 {
            limiter.wait().await;
        }
        assert!(start.elapsed() >= Duration::from_millis(150));
    }
}

// Minimum-interval rate limiter for classifier calls.
//
// One request is let through per interval; callers that arrive early sleep
// until their slot.

use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};

#[derive(Clone)]
pub struct RateLimiter {
    inner: Arc<Mutex<RateLimiterInner>>,
}

struct RateLimiterInner {
    /// Minimum time between requests
    interval: Duration,
    /// When the next request may go out
    next_slot: Option<Instant>,
}

impl RateLimiter {
    /// Allow `requests_per_second` requests per second. Non-positive rates
    /// disable pacing.
    pub fn new(requests_per_second: f64) -> Self {
        let interval = if requests_per_second > 0.0 {
            Duration::from_secs_f64(1.0 / requests_per_second)
        } else {
            Duration::ZERO
        };
        Self {
            inner: Arc::new(Mutex::new(RateLimiterInner {
                interval,
                next_slot: None,
            })),
        }
    }

    /// Wait until a request is allowed, then return.
    pub async fn acquire(&self) {
        // Reserve a slot under the lock, sleep outside it
        let wait_until = {
            let mut inner = self.inner.lock().await;
            let now = Instant::now();
            let slot = match inner.next_slot {
                Some(next) if next > now => next,
                _ => now,
            };
            inner.next_slot = Some(slot + inner.interval);
            slot
        };

        tokio::time::sleep_until(wait_until).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rate_limiter_allows_first_request_immediately() {
        let limiter = RateLimiter::new(1.0);
        let start = Instant::now();
        limiter.acquire().await;
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_rate_limiter_delays_second_request() {
        let limiter = RateLimiter::new(5.0); // 200ms between requests
        limiter.acquire().await;
        let start = Instant::now();
        limiter.acquire().await;
        let elapsed = start.elapsed();
        assert!(
            elapsed >= Duration::from_millis(150),
            "Expected ~200ms delay, got {:?}",
            elapsed
        );
    }

    #[tokio::test]
    async fn test_zero_rate_disables_pacing() {
        let limiter = RateLimiter::new(0.0);
        let start = Instant::now();
        for _ in 0..10 {
            limiter.acquire().await;
        }
        assert!(start.elapsed() < Duration::from_millis(50));
    }
}

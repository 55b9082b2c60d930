use std::num::NonZeroU32;
use std::sync::Arc;

use governor::clock::DefaultClock;
use governor::state::direct::NotKeyed;
use governor::state::InMemoryState;
use governor::{Quota, RateLimiter};

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Client-side request pacing for ISS. Callers wait for budget; nothing is dropped.
#[derive(Clone)]
pub struct RequestThrottle {
    limiter: Option<Arc<DirectRateLimiter>>,
}

impl RequestThrottle {
    /// `requests_per_second == 0` disables throttling.
    pub fn per_second(requests_per_second: u32) -> Self {
        Self {
            limiter: NonZeroU32::new(requests_per_second)
                .map(|rate| Arc::new(RateLimiter::direct(Quota::per_second(rate)))),
        }
    }

    pub const fn is_enabled(&self) -> bool {
        self.limiter.is_some()
    }

    /// Takes one cell of budget without waiting.
    pub fn try_acquire(&self) -> bool {
        self.limiter
            .as_ref()
            .map_or(true, |limiter| limiter.check().is_ok())
    }

    /// Waits until one request may be sent.
    pub async fn acquire(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }
    }
}

impl std::fmt::Debug for RequestThrottle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestThrottle")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_is_exhausted_after_burst() {
        let throttle = RequestThrottle::per_second(2);
        assert!(throttle.try_acquire());
        assert!(throttle.try_acquire());
        assert!(!throttle.try_acquire());
    }

    #[test]
    fn zero_rate_disables_throttling() {
        let throttle = RequestThrottle::per_second(0);
        assert!(!throttle.is_enabled());
        for _ in 0..100 {
            assert!(throttle.try_acquire());
        }
    }

    #[tokio::test]
    async fn acquire_returns_when_budget_is_available() {
        let throttle = RequestThrottle::per_second(50);
        throttle.acquire().await;
        throttle.acquire().await;
    }
}

//! Rate limiting implementation
//!
//! Uses the governor crate for token bucket rate limiting. The platform
//! meters requests per session per minute, so quotas are expressed per
//! minute rather than per second.

use governor::clock::DefaultClock;
use governor::middleware::NoOpMiddleware;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter as Governor};
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;
use std::sync::Arc;

/// Configuration for rate limiting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimiterConfig {
    /// Maximum number of requests per minute
    pub requests_per_minute: u32,
    /// Burst size (max tokens in bucket)
    pub burst_size: u32,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            requests_per_minute: 600,
            burst_size: 10,
        }
    }
}

impl RateLimiterConfig {
    /// Create a new rate limiter config
    pub fn new(requests_per_minute: u32, burst_size: u32) -> Self {
        Self {
            requests_per_minute,
            burst_size,
        }
    }
}

/// Token bucket rate limiter shared by every request of one client
#[derive(Clone)]
pub struct RateLimiter {
    limiter: Arc<Governor<NotKeyed, InMemoryState, DefaultClock, NoOpMiddleware>>,
}

impl RateLimiter {
    /// Create a new rate limiter with the given config
    pub fn new(config: &RateLimiterConfig) -> Self {
        let quota = Quota::per_minute(NonZeroU32::new(config.requests_per_minute).unwrap_or(NonZeroU32::MIN))
            .allow_burst(NonZeroU32::new(config.burst_size).unwrap_or(NonZeroU32::MIN));

        Self {
            limiter: Arc::new(Governor::direct(quota)),
        }
    }

    /// Wait until a request can be made
    pub async fn wait(&self) {
        self.limiter.until_ready().await;
    }

    /// Try to acquire a permit, returning immediately
    pub fn try_acquire(&self) -> bool {
        self.limiter.check().is_ok()
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter").finish()
    }
}

#[cfg(test)]
mod rate_limit_tests {
    use super::*;

    #[test]
    fn test_rate_limiter_config_default() {
        let config = RateLimiterConfig::default();
        assert_eq!(config.requests_per_minute, 600);
        assert_eq!(config.burst_size, 10);
    }

    #[test]
    fn test_rate_limiter_config_deserialize() {
        let config: RateLimiterConfig =
            serde_json::from_str(r#"{"requests_per_minute": 60, "burst_size": 3}"#).unwrap();
        assert_eq!(config, RateLimiterConfig::new(60, 3));
    }

    #[tokio::test]
    async fn test_rate_limiter_allows_burst_then_blocks() {
        let limiter = RateLimiter::new(&RateLimiterConfig::new(60, 3));

        for _ in 0..3 {
            assert!(limiter.try_acquire());
        }
        // One token per second refill; the fourth request must wait
        assert!(!limiter.try_acquire());
    }

    #[tokio::test]
    async fn test_rate_limiter_zero_values_fall_back_to_one() {
        let limiter = RateLimiter::new(&RateLimiterConfig::new(0, 0));
        assert!(limiter.try_acquire());
        assert!(!limiter.try_acquire());
    }

    #[tokio::test]
    async fn test_rate_limiter_wait_returns_with_tokens_left() {
        let limiter = RateLimiter::new(&RateLimiterConfig::new(6000, 10));
        tokio::time::timeout(std::time::Duration::from_millis(100), limiter.wait())
            .await
            .unwrap();
    }
}

//! Rate limiting for the login endpoint.
//!
//! Uses a token bucket algorithm with per-IP tracking to slow down password guessing.

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{Quota, RateLimiter, clock::DefaultClock, state::keyed::DefaultKeyedStateStore};
use std::{num::NonZeroU32, sync::Arc};
use tracing::debug;

use crate::auth::{ClientIpHeader, extract_client_ip};

/// Per-IP rate limiter.
pub type IpLimiter = RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

const DEFAULT_LOGIN_PER_SEC: u32 = 1;
const DEFAULT_LOGIN_BURST: u32 = 5;

/// Rate limiting configuration for the login endpoint.
#[derive(Clone)]
pub struct RateLimitConfig {
    /// Per-IP limiter for login attempts
    pub login: Arc<IpLimiter>,
    /// Where to read the client IP from
    pub ip_header: Option<ClientIpHeader>,
}

impl RateLimitConfig {
    /// Create rate limiters with default configuration (1 per second, burst of 5).
    pub fn new(ip_header: Option<ClientIpHeader>) -> Self {
        Self::with_login_quota(ip_header, DEFAULT_LOGIN_PER_SEC, DEFAULT_LOGIN_BURST)
    }

    /// Create rate limiters with a custom login quota. Zero values are raised to one.
    pub fn with_login_quota(ip_header: Option<ClientIpHeader>, per_second: u32, burst: u32) -> Self {
        let per_second = NonZeroU32::new(per_second).unwrap_or(NonZeroU32::MIN);
        let burst = NonZeroU32::new(burst).unwrap_or(NonZeroU32::MIN);

        Self {
            login: Arc::new(RateLimiter::keyed(
                Quota::per_second(per_second).allow_burst(burst),
            )),
            ip_header,
        }
    }

    /// Drop limiter state for clients whose bucket has fully refilled.
    /// Returns the number of clients still tracked.
    pub fn prune(&self) -> usize {
        self.login.retain_recent();
        self.login.shrink_to_fit();
        let tracked = self.login.len();
        debug!(tracked, "Pruned login rate limiter");
        tracked
    }
}

/// Middleware for rate limiting login endpoints.
pub async fn rate_limit_login(
    State(config): State<RateLimitConfig>,
    request: Request,
    next: Next,
) -> Response {
    let ip = match extract_client_ip(&request, config.ip_header) {
        Ok(ip) => ip,
        Err(_) => {
            return (StatusCode::FORBIDDEN, "Unable to determine client IP.").into_response();
        }
    };

    match config.login.check_key(&ip) {
        Ok(_) => next.run(request).await,
        Err(_) => (
            StatusCode::TOO_MANY_REQUESTS,
            "Too many login attempts. Please wait before trying again.",
        )
            .into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_burst_then_limited() {
        let config = RateLimitConfig::with_login_quota(None, 1, 3);
        let ip = "10.0.0.1".to_string();

        for _ in 0..3 {
            assert!(config.login.check_key(&ip).is_ok());
        }
        assert!(config.login.check_key(&ip).is_err());

        // Other clients have their own bucket
        assert!(config.login.check_key(&"10.0.0.2".to_string()).is_ok());
    }

    #[test]
    fn test_prune_forgets_idle_clients() {
        // 10ms per cell, so every bucket refills well within the sleep
        let config = RateLimitConfig::with_login_quota(None, 100, 1);

        for i in 0..50 {
            let _ = config.login.check_key(&format!("10.0.0.{}", i));
        }
        assert_eq!(config.login.len(), 50);

        std::thread::sleep(std::time::Duration::from_millis(100));

        assert_eq!(config.prune(), 0);
        assert!(config.login.is_empty());
    }

    #[test]
    fn test_prune_keeps_limited_clients() {
        let config = RateLimitConfig::with_login_quota(None, 1, 1);
        let ip = "10.0.0.1".to_string();

        assert!(config.login.check_key(&ip).is_ok());
        assert_eq!(config.prune(), 1);
        assert!(config.login.check_key(&ip).is_err());
    }

    #[test]
    fn test_zero_quota_is_clamped() {
        let config = RateLimitConfig::with_login_quota(None, 0, 0);
        assert!(config.login.check_key(&"ip".to_string()).is_ok());
    }
}

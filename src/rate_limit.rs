//! Per-route rate limiting for the gateway pipeline.
//!
//! Fixed-window counters, one limiter per route tier, keyed by client IP.
//! Limiters live in an explicitly owned registry built once at startup and
//! injected into the router; buckets are process-local and die with the
//! process. Counters give no global ceiling across multiple instances of
//! the service.
//!
//! Tiers:
//! - Strict: license-scoped routes that proxy to costly downstream services
//! - Standard: everything that does crypto/DB work (/validate, admin API)
//! - Relaxed: lightweight endpoints like /health
//!
//! Configure via environment variables:
//! - RATE_LIMIT_STRICT_RPM (default: 10)
//! - RATE_LIMIT_STANDARD_RPM (default: 30)
//! - RATE_LIMIT_RELAXED_RPM (default: 60)

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::{extract::Request, extract::State, middleware::Next, response::Response};

use crate::config::RateLimitSettings;
use crate::error::{AppError, Result};
use crate::util::client_ip;

/// Buckets map is pruned when it grows past this many entries.
const PRUNE_THRESHOLD: usize = 4096;

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub window: Duration,
    pub message: String,
}

#[derive(Debug, Clone, Copy)]
struct Bucket {
    window_start: Instant,
    count: u32,
}

/// One route's request-budget tracker.
///
/// Construct once per route and reuse across requests; a fresh limiter per
/// request would never reject anything.
pub struct RateLimiter {
    config: RateLimitConfig,
    buckets: Mutex<HashMap<String, Bucket>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            buckets: Mutex::new(HashMap::new()),
        }
    }

    /// Record one request for `client_key` and decide whether it fits the
    /// current window. The whole read-modify-write happens under the lock.
    pub fn check(&self, client_key: &str) -> Result<()> {
        self.check_at(client_key, Instant::now())
    }

    fn check_at(&self, client_key: &str, now: Instant) -> Result<()> {
        let mut buckets = self.buckets.lock().expect("rate limiter lock poisoned");

        if buckets.len() > PRUNE_THRESHOLD {
            let window = self.config.window;
            buckets.retain(|_, bucket| now.duration_since(bucket.window_start) < window);
        }

        let bucket = buckets
            .entry(client_key.to_string())
            .or_insert(Bucket {
                window_start: now,
                count: 0,
            });

        if now.duration_since(bucket.window_start) >= self.config.window {
            // Window elapsed: start a fresh one with this request counted
            bucket.window_start = now;
            bucket.count = 1;
            return Ok(());
        }

        bucket.count += 1;
        if bucket.count <= self.config.max_requests {
            Ok(())
        } else {
            Err(AppError::RateLimited(self.config.message.clone()))
        }
    }
}

/// The registry of per-tier limiters, owned by whoever builds the router.
#[derive(Clone)]
pub struct RateLimiters {
    pub relaxed: Arc<RateLimiter>,
    pub standard: Arc<RateLimiter>,
    pub strict: Arc<RateLimiter>,
}

impl RateLimiters {
    pub fn from_settings(settings: &RateLimitSettings) -> Self {
        let minute = Duration::from_secs(60);

        Self {
            relaxed: Arc::new(RateLimiter::new(RateLimitConfig {
                max_requests: settings.relaxed_rpm,
                window: minute,
                message: "Too many requests, slow down".to_string(),
            })),
            standard: Arc::new(RateLimiter::new(RateLimitConfig {
                max_requests: settings.standard_rpm,
                window: minute,
                message: "Too many requests, try again later".to_string(),
            })),
            strict: Arc::new(RateLimiter::new(RateLimitConfig {
                max_requests: settings.strict_rpm,
                window: minute,
                message: "This endpoint is strictly rate limited, try again later".to_string(),
            })),
        }
    }
}

/// Gateway stage: runs before every other check on a route.
pub async fn rate_limit(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Result<Response> {
    let key = client_ip(&request);
    limiter.check(&key)?;
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(max_requests: u32, window_secs: u64) -> RateLimiter {
        RateLimiter::new(RateLimitConfig {
            max_requests,
            window: Duration::from_secs(window_secs),
            message: "slow down".to_string(),
        })
    }

    #[test]
    fn allows_up_to_max_then_rejects() {
        let limiter = limiter(3, 60);
        let now = Instant::now();

        for _ in 0..3 {
            assert!(limiter.check_at("1.2.3.4", now).is_ok());
        }
        assert!(limiter.check_at("1.2.3.4", now).is_err());
    }

    #[test]
    fn fresh_window_after_elapse() {
        let limiter = limiter(2, 60);
        let now = Instant::now();

        assert!(limiter.check_at("1.2.3.4", now).is_ok());
        assert!(limiter.check_at("1.2.3.4", now).is_ok());
        assert!(limiter.check_at("1.2.3.4", now).is_err());

        let later = now + Duration::from_secs(61);
        assert!(limiter.check_at("1.2.3.4", later).is_ok());
        assert!(limiter.check_at("1.2.3.4", later).is_ok());
        assert!(limiter.check_at("1.2.3.4", later).is_err());
    }

    #[test]
    fn keys_are_tracked_independently() {
        let limiter = limiter(1, 60);
        let now = Instant::now();

        assert!(limiter.check_at("1.2.3.4", now).is_ok());
        assert!(limiter.check_at("5.6.7.8", now).is_ok());
        assert!(limiter.check_at("1.2.3.4", now).is_err());
    }

    #[test]
    fn rejection_carries_configured_message() {
        let limiter = limiter(0, 60);
        let err = limiter.check_at("1.2.3.4", Instant::now()).unwrap_err();
        match err {
            AppError::RateLimited(msg) => assert_eq!(msg, "slow down"),
            other => panic!("expected RateLimited, got {:?}", other),
        }
    }
}

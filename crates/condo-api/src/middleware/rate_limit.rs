//! # Login Rate Limiting
//!
//! Fixed-window limiter keyed by client address. Mounted on `/login` only;
//! in-memory, so each replica counts on its own.
//!
//! The key is the TCP peer address. `X-Forwarded-For` is read only when
//! the deployment opts in (the service sits behind a proxy that appends the
//! real peer), and then only its right-most entry, the one that proxy wrote.
//! The number of tracked clients is capped; when the table is full of live
//! windows, unseen clients are refused until one expires.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::{ConnectInfo, Request};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use parking_lot::Mutex;

use crate::error::ErrorBody;

/// Default cap on tracked client keys.
pub const DEFAULT_MAX_CLIENTS: usize = 10_000;

/// Rate limiter configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Maximum requests per window.
    pub max_requests: u64,
    /// Window duration in seconds.
    pub window_secs: u64,
    /// Key on the right-most `X-Forwarded-For` entry instead of the peer.
    pub trust_forwarded_for: bool,
    /// Most client keys held at once.
    pub max_clients: usize,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 10,
            window_secs: 60,
            trust_forwarded_for: false,
            max_clients: DEFAULT_MAX_CLIENTS,
        }
    }
}

#[derive(Debug, Clone)]
struct BucketState {
    count: u64,
    window_start: Instant,
}

/// Shared rate limiter state.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    config: RateLimitConfig,
    buckets: Arc<Mutex<HashMap<String, BucketState>>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            buckets: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Count one request for `key`; `false` once the window is full.
    fn check(&self, key: &str) -> bool {
        self.check_at(key, Instant::now())
    }

    fn check_at(&self, key: &str, now: Instant) -> bool {
        let window = Duration::from_secs(self.config.window_secs);
        let mut buckets = self.buckets.lock();

        if !buckets.contains_key(key) && buckets.len() >= self.config.max_clients {
            buckets.retain(|_, b| now.duration_since(b.window_start) < window);
            if buckets.len() >= self.config.max_clients {
                tracing::warn!(tracked = buckets.len(), "login rate limit table full");
                return false;
            }
        }

        let bucket = buckets.entry(key.to_string()).or_insert(BucketState {
            count: 0,
            window_start: now,
        });
        if now.duration_since(bucket.window_start) >= window {
            bucket.count = 0;
            bucket.window_start = now;
        }
        if bucket.count >= self.config.max_requests {
            false
        } else {
            bucket.count += 1;
            true
        }
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.buckets.lock().len()
    }

    /// Key for `request`: the right-most `X-Forwarded-For` entry when
    /// trusted, else the peer address, else `"anonymous"`.
    fn client_key(&self, request: &Request) -> String {
        if self.config.trust_forwarded_for {
            if let Some(forwarded) = request
                .headers()
                .get("x-forwarded-for")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.rsplit(',').next())
                .map(str::trim)
                .filter(|v| !v.is_empty())
            {
                return forwarded.to_string();
            }
        }
        request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string())
            .unwrap_or_else(|| "anonymous".to_string())
    }
}

/// Middleware that rejects requests over the limit with 429.
pub async fn rate_limit_middleware(request: Request, next: Next) -> Response {
    let limiter = request.extensions().get::<RateLimiter>().cloned();

    if let Some(limiter) = limiter {
        let key = limiter.client_key(&request);
        if !limiter.check(&key) {
            tracing::warn!(client = %key, "login rate limit exceeded");
            let body = ErrorBody::new("RATE_LIMITED", "too many login attempts, try again later");
            return (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
        }
    }

    next.run(request).await
}

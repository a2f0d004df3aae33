//! Per-IP rate limiting for the auth routes
//!
//! Fixed window counter: each client's window starts with its first request
//! and its counter entry expires from the moka cache when the window ends.
//! A fixed window admits up to twice the limit across a window boundary.
//!
//! Clients are keyed by peer address. `X-Forwarded-For` is honoured only when
//! `trust_forwarded_for` is set, because a directly exposed server would let
//! clients pick their own key by rotating the header. Enable it only behind a
//! reverse proxy that overwrites the header.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

use axum::extract::{ConnectInfo, Request, State};
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;
use moka::future::Cache;

use super::types::ApiError;
use crate::core::constants::{DEFAULT_RATE_LIMIT_WINDOW_SECS, RATE_LIMIT_MAX_CLIENTS};

/// Counter for one client in the current window
#[derive(Debug)]
struct Window {
    started: Instant,
    count: AtomicU32,
}

/// Rate limit check result
#[derive(Debug, Clone)]
pub struct RateLimitResult {
    pub allowed: bool,
    pub remaining: u32,
    pub limit: u32,
    /// Seconds until the window resets
    pub reset_after: u64,
}

/// Fixed-window rate limiter keyed by client identifier
#[derive(Clone)]
pub struct RateLimiter {
    windows: Cache<String, Arc<Window>>,
    limit: u32,
    window: Duration,
    trust_forwarded_for: bool,
}

impl RateLimiter {
    /// Limiter allowing `requests_per_minute` per client
    pub fn per_minute(requests_per_minute: u32) -> Self {
        Self::new(
            requests_per_minute,
            Duration::from_secs(DEFAULT_RATE_LIMIT_WINDOW_SECS),
        )
    }

    pub fn new(limit: u32, window: Duration) -> Self {
        let windows = Cache::builder()
            .max_capacity(RATE_LIMIT_MAX_CLIENTS)
            .time_to_live(window)
            .build();
        Self {
            windows,
            limit,
            window,
            trust_forwarded_for: false,
        }
    }

    /// Key clients on the first `X-Forwarded-For` hop instead of the peer
    pub fn trust_forwarded_for(mut self, trust: bool) -> Self {
        self.trust_forwarded_for = trust;
        self
    }

    /// Count a request for `key` and report whether it is allowed
    pub async fn check(&self, key: &str) -> RateLimitResult {
        let entry = self
            .windows
            .get_with(key.to_string(), async {
                Arc::new(Window {
                    started: Instant::now(),
                    count: AtomicU32::new(0),
                })
            })
            .await;

        let count = entry.count.fetch_add(1, Ordering::Relaxed).saturating_add(1);
        let elapsed = entry.started.elapsed();
        let reset_after = self.window.saturating_sub(elapsed).as_secs().max(1);

        let allowed = count <= self.limit;
        tracing::trace!(%key, count, limit = self.limit, allowed, "Rate limit check");

        RateLimitResult {
            allowed,
            remaining: self.limit.saturating_sub(count),
            limit: self.limit,
            reset_after,
        }
    }
}

/// Client identifier: the peer address, or the first `X-Forwarded-For` hop
/// when the proxy is trusted
fn client_key(request: &Request, addr: Option<SocketAddr>, trust_forwarded_for: bool) -> String {
    let forwarded = trust_forwarded_for
        .then(|| {
            request
                .headers()
                .get("X-Forwarded-For")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.split(',').next())
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        })
        .flatten();

    forwarded
        .or_else(|| addr.map(|a| a.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}

fn add_rate_limit_headers(response: &mut Response, result: &RateLimitResult) {
    let headers = response.headers_mut();
    headers.insert("X-RateLimit-Limit", HeaderValue::from(result.limit));
    headers.insert("X-RateLimit-Remaining", HeaderValue::from(result.remaining));
    headers.insert("X-RateLimit-Reset", HeaderValue::from(result.reset_after));
}

/// Rate limiting middleware function
pub async fn rate_limit_middleware(
    State(limiter): State<RateLimiter>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let key = client_key(&request, peer, limiter.trust_forwarded_for);
    let result = limiter.check(&key).await;

    if !result.allowed {
        tracing::debug!(%key, "Rate limit exceeded");
        return Err(ApiError::too_many_requests(result.reset_after));
    }

    let mut response = next.run(request).await;
    add_rate_limit_headers(&mut response, &result);
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::body::Body;
    use axum::http::{StatusCode, header};
    use axum::routing::post;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_allows_under_limit() {
        let limiter = RateLimiter::per_minute(5);
        for i in 0..5 {
            let result = limiter.check("10.0.0.1").await;
            assert!(result.allowed, "request {} should be allowed", i);
        }
        assert_eq!(limiter.check("10.0.0.1").await.remaining, 0);
    }

    #[tokio::test]
    async fn test_blocks_over_limit_per_client() {
        let limiter = RateLimiter::per_minute(2);
        assert!(limiter.check("a").await.allowed);
        assert!(limiter.check("a").await.allowed);
        let blocked = limiter.check("a").await;
        assert!(!blocked.allowed);
        assert!(blocked.reset_after >= 1);

        assert!(limiter.check("b").await.allowed);
    }

    #[tokio::test]
    async fn test_window_resets() {
        let limiter = RateLimiter::new(1, Duration::from_millis(50));
        assert!(limiter.check("a").await.allowed);
        assert!(!limiter.check("a").await.allowed);
        tokio::time::sleep(Duration::from_millis(120)).await;
        assert!(limiter.check("a").await.allowed);
    }

    fn forwarded(ip: &str) -> Request {
        Request::builder()
            .header("X-Forwarded-For", ip)
            .body(Body::empty())
            .unwrap()
    }

    #[test]
    fn test_client_key_ignores_forwarded_for_by_default() {
        let peer: SocketAddr = "198.51.100.4:5123".parse().unwrap();
        assert_eq!(client_key(&forwarded("203.0.113.7"), Some(peer), false), "198.51.100.4");
        assert_eq!(
            client_key(&forwarded("203.0.113.7, 10.0.0.1"), Some(peer), true),
            "203.0.113.7"
        );
        assert_eq!(client_key(&forwarded(""), Some(peer), true), "198.51.100.4");
    }

    #[tokio::test]
    async fn test_rotating_forwarded_for_does_not_bypass_limit() {
        let app = Router::new()
            .route("/login", post(|| async { "ok" }))
            .layer(axum::middleware::from_fn_with_state(
                RateLimiter::per_minute(1),
                rate_limit_middleware,
            ));

        let login = |ip: &str| {
            Request::builder()
                .method("POST")
                .uri("/login")
                .header("X-Forwarded-For", ip)
                .body(Body::empty())
                .unwrap()
        };

        let first = app.clone().oneshot(login("203.0.113.7")).await.unwrap();
        assert_eq!(first.status(), StatusCode::OK);
        let second = app.oneshot(login("203.0.113.8")).await.unwrap();
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn test_trusted_proxy_limits_each_forwarded_client() {
        let app = Router::new()
            .route("/login", post(|| async { "ok" }))
            .layer(axum::middleware::from_fn_with_state(
                RateLimiter::per_minute(1).trust_forwarded_for(true),
                rate_limit_middleware,
            ));

        let login = |ip: &str| {
            Request::builder()
                .method("POST")
                .uri("/login")
                .header("X-Forwarded-For", ip)
                .body(Body::empty())
                .unwrap()
        };

        let a = app.clone().oneshot(login("203.0.113.7")).await.unwrap();
        assert_eq!(a.status(), StatusCode::OK);
        let b = app.clone().oneshot(login("203.0.113.8")).await.unwrap();
        assert_eq!(b.status(), StatusCode::OK);
        let a_again = app.oneshot(login("203.0.113.7")).await.unwrap();
        assert_eq!(a_again.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn test_middleware_returns_429_with_retry_after() {
        let limiter = RateLimiter::per_minute(1);
        let app = Router::new()
            .route("/login", post(|| async { "ok" }))
            .layer(axum::middleware::from_fn_with_state(
                limiter,
                rate_limit_middleware,
            ));

        let request = || {
            Request::builder()
                .method("POST")
                .uri("/login")
                .header("X-Forwarded-For", "203.0.113.7")
                .body(Body::empty())
                .unwrap()
        };

        let first = app.clone().oneshot(request()).await.unwrap();
        assert_eq!(first.status(), StatusCode::OK);
        assert_eq!(first.headers()["X-RateLimit-Remaining"], "0");

        let second = app.oneshot(request()).await.unwrap();
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(second.headers().contains_key(header::RETRY_AFTER));
    }
}

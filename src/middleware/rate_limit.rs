//! Fixed-window rate limiting middleware

use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::AppError;
use crate::models::auth::AuthContext;

/// Bucket shared by every request that carries no client IP headers.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Default probability that a `check` call also sweeps expired records.
pub const DEFAULT_SWEEP_PROBABILITY: f64 = 0.01;

/// Rate limit configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub window: Duration,
    pub max_requests: u32,
}

impl RateLimitConfig {
    /// Login and registration endpoints
    pub const AUTH: RateLimitConfig = RateLimitConfig {
        window: Duration::from_secs(15 * 60), // 15 minutes
        max_requests: 5,
    };

    /// Job search
    pub const SEARCH: RateLimitConfig = RateLimitConfig {
        window: Duration::from_secs(60), // 1 minute
        max_requests: 30,
    };

    pub fn from_millis(window_ms: u64, max_requests: u32) -> Self {
        Self {
            window: Duration::from_millis(window_ms),
            max_requests,
        }
    }
}

/// Outcome of a single `check`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub remaining: u32,
    pub reset_at: Instant,
}

impl RateLimitDecision {
    /// Time left until the current window closes
    pub fn reset_in(&self) -> Duration {
        self.reset_at.saturating_duration_since(Instant::now())
    }

    /// Whole seconds until the window closes, rounded up
    pub fn retry_after_secs(&self) -> u64 {
        let reset_in = self.reset_in();
        reset_in.as_secs() + u64::from(reset_in.subsec_nanos() > 0)
    }
}

#[derive(Debug, Clone, Copy)]
struct RateLimitRecord {
    count: u32,
    reset_at: Instant,
}

/// In-memory, per-process fixed-window limiter.
///
/// Every instance owns its own key space; the auth and search limiters never
/// see each other's counters.
#[derive(Debug)]
pub struct RateLimiter {
    name: &'static str,
    config: RateLimitConfig,
    sweep_probability: f64,
    records: Mutex<HashMap<String, RateLimitRecord>>,
}

impl RateLimiter {
    pub fn new(name: &'static str, config: RateLimitConfig) -> Self {
        Self::with_sweep_probability(name, config, DEFAULT_SWEEP_PROBABILITY)
    }

    /// Probabilities outside 0..=1 are clamped; NaN falls back to the default
    pub fn with_sweep_probability(
        name: &'static str,
        config: RateLimitConfig,
        sweep_probability: f64,
    ) -> Self {
        let sweep_probability = if sweep_probability.is_nan() {
            DEFAULT_SWEEP_PROBABILITY
        } else {
            sweep_probability.clamp(0.0, 1.0)
        };

        Self {
            name,
            config,
            sweep_probability,
            records: Mutex::new(HashMap::new()),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn config(&self) -> RateLimitConfig {
        self.config
    }

    /// Count a request for `identifier` against the current window.
    pub async fn check(&self, identifier: &str) -> RateLimitDecision {
        let sweep = rand::thread_rng().gen_bool(self.sweep_probability);
        let now = Instant::now();
        let max_requests = self.config.max_requests;

        let mut records = self.records.lock().await;

        if sweep {
            let before = records.len();
            records.retain(|_, record| now < record.reset_at);
            debug!(
                limiter = self.name,
                removed = before - records.len(),
                "Swept expired rate limit records"
            );
        }

        if let Some(record) = records
            .get_mut(identifier)
            .filter(|record| now < record.reset_at)
        {
            if record.count >= max_requests {
                return RateLimitDecision {
                    allowed: false,
                    remaining: 0,
                    reset_at: record.reset_at,
                };
            }

            record.count += 1;
            return RateLimitDecision {
                allowed: true,
                remaining: max_requests - record.count,
                reset_at: record.reset_at,
            };
        }

        // First request for this key, or its window has closed: start over.
        let record = RateLimitRecord {
            count: 1,
            reset_at: now + self.config.window,
        };
        records.insert(identifier.to_string(), record);

        RateLimitDecision {
            allowed: max_requests > 0,
            remaining: max_requests.saturating_sub(1),
            reset_at: record.reset_at,
        }
    }

    /// Drop every record whose window has closed
    pub async fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let mut records = self.records.lock().await;
        let before = records.len();
        records.retain(|_, record| now < record.reset_at);
        before - records.len()
    }

    /// Number of tracked keys, expired or not
    pub async fn tracked_keys(&self) -> usize {
        self.records.lock().await.len()
    }
}

/// Client identifier from proxy headers.
///
/// First entry of `x-forwarded-for`, then `x-real-ip`, then the shared
/// `unknown` bucket.
pub fn client_identifier(headers: &HeaderMap) -> String {
    if let Some(forwarded_for) = headers.get("x-forwarded-for") {
        if let Ok(forwarded_str) = forwarded_for.to_str() {
            let first = forwarded_str.split(',').next().unwrap_or("").trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }

    if let Some(real_ip) = headers.get("x-real-ip") {
        if let Ok(real_ip_str) = real_ip.to_str() {
            let real_ip_str = real_ip_str.trim();
            if !real_ip_str.is_empty() {
                return real_ip_str.to_string();
            }
        }
    }

    UNKNOWN_CLIENT.to_string()
}

/// Key for a request: the signed-in user when there is one, else the client IP.
fn request_key(request: &Request) -> String {
    match request.extensions().get::<AuthContext>() {
        Some(auth) => format!("user:{}", auth.user_id),
        None => format!("ip:{}", client_identifier(request.headers())),
    }
}

fn set_rate_limit_headers(headers: &mut HeaderMap, limit: u32, decision: &RateLimitDecision) {
    headers.insert("x-ratelimit-limit", HeaderValue::from(limit));
    headers.insert("x-ratelimit-remaining", HeaderValue::from(decision.remaining));
    headers.insert("x-ratelimit-reset", HeaderValue::from(decision.retry_after_secs()));
}

/// Rate limiting middleware
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    let key = request_key(&request);
    let decision = limiter.check(&key).await;
    let limit = limiter.config().max_requests;

    if !decision.allowed {
        warn!(
            limiter = limiter.name(),
            key = %key,
            path = %request.uri().path(),
            "Rate limit exceeded"
        );
        let mut response = AppError::RateLimit {
            retry_after_secs: decision.retry_after_secs(),
        }
        .into_response();
        set_rate_limit_headers(response.headers_mut(), limit, &decision);
        return response;
    }

    let mut response = next.run(request).await;
    set_rate_limit_headers(response.headers_mut(), limit, &decision);
    response
}

/// Periodically drop expired records so idle keys do not accumulate
pub async fn cleanup_task(limiters: Vec<Arc<RateLimiter>>, every: Duration) {
    let mut interval = tokio::time::interval(every);

    loop {
        interval.tick().await;
        for limiter in &limiters {
            let removed = limiter.sweep_expired().await;
            debug!(limiter = limiter.name(), removed, "Cleaned up expired rate limit entries");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        routing::get,
        Router,
    };
    use tower::ServiceExt;

    fn limiter(window_ms: u64, max_requests: u32) -> RateLimiter {
        RateLimiter::with_sweep_probability(
            "test",
            RateLimitConfig::from_millis(window_ms, max_requests),
            0.0,
        )
    }

    #[tokio::test]
    async fn test_quota_then_rejection() {
        let limiter = limiter(1000, 2);

        let first = limiter.check("x").await;
        assert!(first.allowed);
        assert_eq!(first.remaining, 1);

        let second = limiter.check("x").await;
        assert!(second.allowed);
        assert_eq!(second.remaining, 0);

        let third = limiter.check("x").await;
        assert!(!third.allowed);
        assert_eq!(third.remaining, 0);
    }

    #[tokio::test]
    async fn test_remaining_strictly_decreases_until_rejected() {
        let limiter = limiter(60_000, 5);
        let mut last = u32::MAX;

        for _ in 0..5 {
            let decision = limiter.check("client").await;
            assert!(decision.allowed);
            assert!(decision.remaining < last);
            last = decision.remaining;
        }

        let rejected = limiter.check("client").await;
        assert!(!rejected.allowed);
        assert_eq!(rejected.remaining, 0);
    }

    #[tokio::test]
    async fn test_window_resets_after_expiry() {
        let limiter = limiter(100, 2);
        assert!(limiter.check("y").await.allowed);
        assert!(limiter.check("y").await.allowed);
        assert!(!limiter.check("y").await.allowed);

        tokio::time::sleep(Duration::from_millis(150)).await;

        let decision = limiter.check("y").await;
        assert!(decision.allowed);
        assert_eq!(decision.remaining, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejections_do_not_extend_the_window() {
        let limiter = limiter(15 * 60 * 1000, 1);
        let first = limiter.check("ip").await;

        tokio::time::advance(Duration::from_secs(600)).await;
        let rejected = limiter.check("ip").await;
        assert!(!rejected.allowed);
        assert_eq!(rejected.reset_at, first.reset_at);

        tokio::time::advance(Duration::from_secs(300)).await;
        let decision = limiter.check("ip").await;
        assert!(decision.allowed);
        assert_eq!(decision.remaining, 0);
        assert!(decision.reset_at > first.reset_at);
    }

    #[tokio::test]
    async fn test_identifiers_are_isolated() {
        let limiter = limiter(60_000, 1);
        assert!(limiter.check("i1").await.allowed);
        assert!(!limiter.check("i1").await.allowed);

        let other = limiter.check("i2").await;
        assert!(other.allowed);
        assert_eq!(other.remaining, 0);
    }

    #[tokio::test]
    async fn test_limiter_instances_are_isolated() {
        let auth = RateLimiter::new("auth", RateLimitConfig::AUTH);
        let search = RateLimiter::new("search", RateLimitConfig::SEARCH);

        for _ in 0..5 {
            assert!(auth.check("1.2.3.4").await.allowed);
        }
        assert!(!auth.check("1.2.3.4").await.allowed);

        let decision = search.check("1.2.3.4").await;
        assert!(decision.allowed);
        assert_eq!(decision.remaining, 29);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_removes_only_expired_records() {
        let limiter = limiter(1000, 3);
        limiter.check("old").await;
        tokio::time::advance(Duration::from_millis(600)).await;
        limiter.check("fresh").await;
        tokio::time::advance(Duration::from_millis(500)).await;

        assert_eq!(limiter.sweep_expired().await, 1);
        assert_eq!(limiter.tracked_keys().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_probabilistic_sweep_runs_when_certain() {
        let limiter = RateLimiter::with_sweep_probability(
            "sweeping",
            RateLimitConfig::from_millis(100, 3),
            1.0,
        );
        limiter.check("a").await;
        limiter.check("b").await;
        tokio::time::advance(Duration::from_millis(200)).await;

        limiter.check("c").await;
        assert_eq!(limiter.tracked_keys().await, 1);
    }

    #[tokio::test]
    async fn test_out_of_range_sweep_probability_is_normalized() {
        let config = RateLimitConfig::from_millis(1000, 1);

        let nan = RateLimiter::with_sweep_probability("nan", config, f64::NAN);
        assert_eq!(nan.sweep_probability, DEFAULT_SWEEP_PROBABILITY);
        assert!(nan.check("a").await.allowed);

        let high = RateLimiter::with_sweep_probability("high", config, f64::INFINITY);
        assert_eq!(high.sweep_probability, 1.0);
        assert!(high.check("a").await.allowed);

        let low = RateLimiter::with_sweep_probability("low", config, -3.0);
        assert_eq!(low.sweep_probability, 0.0);
        assert!(low.check("a").await.allowed);
    }

    #[test]
    fn test_client_identifier_prefers_first_forwarded_ip() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static(" 10.0.0.1 , 10.0.0.2"));
        headers.insert("x-real-ip", HeaderValue::from_static("192.168.1.1"));
        assert_eq!(client_identifier(&headers), "10.0.0.1");
    }

    #[test]
    fn test_client_identifier_falls_back_to_real_ip() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("192.168.1.1"));
        assert_eq!(client_identifier(&headers), "192.168.1.1");
    }

    #[test]
    fn test_client_identifier_collapses_to_unknown() {
        assert_eq!(client_identifier(&HeaderMap::new()), UNKNOWN_CLIENT);

        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static(""));
        assert_eq!(client_identifier(&headers), UNKNOWN_CLIENT);
    }

    #[tokio::test]
    async fn test_middleware_rejects_with_429() {
        let limiter = Arc::new(limiter(60_000, 2));
        let app = Router::new()
            .route("/search", get(|| async { "ok" }))
            .layer(axum::middleware::from_fn_with_state(
                limiter,
                rate_limit_middleware,
            ));

        let request = || {
            Request::builder()
                .uri("/search")
                .header("x-forwarded-for", "203.0.113.9")
                .body(Body::empty())
                .unwrap()
        };

        let response = app.clone().oneshot(request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-ratelimit-remaining"], "1");

        let response = app.clone().oneshot(request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app.clone().oneshot(request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()["x-ratelimit-remaining"], "0");
        assert!(response.headers().contains_key("retry-after"));

        // A different client still gets through.
        let other = Request::builder()
            .uri("/search")
            .header("x-forwarded-for", "198.51.100.7")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(other).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}

//! Fixed-window rate limiting per client

use axum::extract::{ConnectInfo, Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use dashmap::DashMap;
use std::net::SocketAddr;
use std::time::{SystemTime, UNIX_EPOCH};

use super::state::AppState;

/// Per-client fixed-window request counter
///
/// Windows are aligned to wall-clock minutes: the counter resets when the
/// minute index changes, so a burst spanning a boundary can briefly see up to
/// twice the limit. That is the accepted trade-off of the fixed window.
pub struct RateLimiter {
    max_per_minute: u32,
    buckets: DashMap<String, Window>,
}

struct Window {
    index: u64,
    count: u32,
}

impl RateLimiter {
    /// Create a limiter allowing `max_per_minute` requests per client
    pub fn new(max_per_minute: u32) -> Self {
        Self {
            max_per_minute,
            buckets: DashMap::new(),
        }
    }

    /// Whether a request from `key` is allowed right now
    pub fn allow(&self, key: &str) -> bool {
        let now_secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        self.allow_at(key, now_secs)
    }

    fn allow_at(&self, key: &str, now_secs: u64) -> bool {
        let window = now_secs / 60;
        let mut entry = self.buckets.entry(key.to_string()).or_insert(Window {
            index: window,
            count: 0,
        });

        if entry.index != window {
            entry.index = window;
            entry.count = 0;
        }

        if entry.count < self.max_per_minute {
            entry.count += 1;
            true
        } else {
            false
        }
    }
}

/// Middleware rejecting clients that exceed the per-minute limit
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    let client = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip().to_string())
        .unwrap_or_else(|| "anon".to_string());

    if !state.limiter().allow(&client) {
        tracing::warn!("rate limit exceeded for {}", client);
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(serde_json::json!({ "detail": "Rate limit exceeded" })),
        )
            .into_response();
    }

    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_up_to_the_limit_within_one_window() {
        let limiter = RateLimiter::new(3);
        let t = 1_700_000_000;
        assert!(limiter.allow_at("10.0.0.1", t));
        assert!(limiter.allow_at("10.0.0.1", t + 1));
        assert!(limiter.allow_at("10.0.0.1", t + 2));
        assert!(!limiter.allow_at("10.0.0.1", t + 3));
    }

    #[test]
    fn window_rollover_resets_the_count() {
        let limiter = RateLimiter::new(1);
        let t = 1_700_000_000;
        assert!(limiter.allow_at("10.0.0.1", t));
        assert!(!limiter.allow_at("10.0.0.1", t + 1));
        assert!(limiter.allow_at("10.0.0.1", t + 60));
    }

    #[test]
    fn clients_are_tracked_independently() {
        let limiter = RateLimiter::new(1);
        let t = 1_700_000_000;
        assert!(limiter.allow_at("10.0.0.1", t));
        assert!(limiter.allow_at("10.0.0.2", t));
        assert!(!limiter.allow_at("10.0.0.1", t + 5));
    }
}

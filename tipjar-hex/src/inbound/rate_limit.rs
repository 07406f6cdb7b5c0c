//! Per-caller rate limiting.
//!
//! Each bearer token gets its own token bucket; requests without a token
//! (public page views, donations before signup) all drain one shared
//! anonymous bucket.

use axum::{
    Json,
    body::Body,
    extract::State,
    http::{Request, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
};
use serde_json::json;
use std::{num::NonZeroU32, sync::Arc, time::Duration};

const ANONYMOUS_BUCKET: &str = "anonymous";

/// Token buckets shared across requests, one per bearer token.
pub struct RateLimiterState {
    buckets: DashMap<String, Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>>,
    /// Quota applied to every newly seen caller.
    quota: Quota,
}

impl Default for RateLimiterState {
    fn default() -> Self {
        Self::new(100, Duration::from_secs(60))
    }
}

impl RateLimiterState {
    /// Allows `requests` requests per caller per `period`.
    pub fn new(requests: u32, period: Duration) -> Self {
        let quota = Quota::with_period(period)
            .unwrap()
            .allow_burst(NonZeroU32::new(requests).unwrap());

        Self {
            buckets: DashMap::new(),
            quota,
        }
    }

    /// Checks the bucket for the given Authorization header value.
    /// Returns true if the request is allowed, false if rate limited.
    pub fn allow(&self, authorization: Option<&str>) -> bool {
        let key = authorization
            .map(|value| value.trim_start_matches("Bearer ").trim())
            .filter(|token| !token.is_empty())
            .unwrap_or(ANONYMOUS_BUCKET);

        let bucket = self
            .buckets
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(RateLimiter::direct(self.quota)));

        bucket.check().is_ok()
    }
}

/// Rate limiting middleware. `/health` is exempt so probes are never throttled.
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiterState>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if request.uri().path() == "/health" {
        return next.run(request).await;
    }

    let authorization = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    if !limiter.allow(authorization) {
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({
                "error": "Rate limit exceeded. Please try again later.",
                "retry_after_seconds": 60
            })),
        )
            .into_response();
    }

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quota_exhausts_per_token() {
        let state = RateLimiterState::new(2, Duration::from_secs(60));

        assert!(state.allow(Some("Bearer tk_one")));
        assert!(state.allow(Some("Bearer tk_one")));
        assert!(!state.allow(Some("Bearer tk_one")));

        // A different token has its own bucket.
        assert!(state.allow(Some("Bearer tk_two")));
    }

    #[test]
    fn test_anonymous_callers_share_one_bucket() {
        let state = RateLimiterState::new(1, Duration::from_secs(60));

        assert!(state.allow(None));
        assert!(!state.allow(None));
        // An empty bearer value counts as anonymous too.
        assert!(!state.allow(Some("Bearer ")));
    }
}

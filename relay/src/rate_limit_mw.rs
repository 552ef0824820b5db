//! Sliding-window rate-limit middleware: runs ahead of every route, stamping
//! `X-RateLimit-*` headers on the response and rejecting with 429 + `Retry-After`
//! once a client key exceeds its budget.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderValue, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use chrono::{TimeZone, Utc};
use relay_types::{RelayError, UnixTimestampMs};

use crate::state::AppState;

fn client_key(headers: &axum::http::HeaderMap, peer: SocketAddr) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .unwrap_or_else(|| peer.ip().to_string())
}

fn rfc3339(epoch_ms: u64) -> String {
    Utc.timestamp_millis_opt(epoch_ms as i64)
        .single()
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_default()
}

pub async fn rate_limit(
    State(state): State<Arc<AppState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: Request<axum::body::Body>,
    next: Next,
) -> Response {
    let key = client_key(request.headers(), peer);
    let now_ms = UnixTimestampMs::now().as_millis();
    let decision = state.rate_limiter.check(&key, now_ms);

    let mut response = if decision.allowed {
        next.run(request).await
    } else {
        RelayError::RateLimited {
            retry_after_s: decision.retry_after_s.unwrap_or(60),
        }
        .into_response()
    };

    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(&decision.limit.to_string()) {
        headers.insert("x-ratelimit-limit", value);
    }
    if let Ok(value) = HeaderValue::from_str(&decision.remaining.to_string()) {
        headers.insert("x-ratelimit-remaining", value);
    }
    if let Ok(value) = HeaderValue::from_str(&rfc3339(decision.reset_at_ms)) {
        headers.insert("x-ratelimit-reset", value);
    }
    if let Some(retry_after_s) = decision.retry_after_s {
        if let Ok(value) = HeaderValue::from_str(&retry_after_s.to_string()) {
            headers.insert("retry-after", value);
        }
    }

    response
}

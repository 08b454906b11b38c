// Admission control middleware.
//
// Runs after identity extraction and before any business logic. Identity
// tiering: authenticated subject when present, otherwise the first
// X-Forwarded-For entry, otherwise the transport peer address. When the
// shared store is unreachable the request is allowed; admission is
// protection, not correctness.

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Request},
    http::{header, HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::config;
use crate::error::ApiError;
use crate::rate_limit::{self, Tier};
use crate::store;

use super::auth::AuthUser;

pub async fn rate_limit_middleware(request: Request, next: Next) -> Response {
    let cfg = &config::config().rate_limit;
    if !cfg.enabled {
        return next.run(request).await;
    }

    let (identifier, tier) = match request.extensions().get::<AuthUser>() {
        Some(user) => (
            format!("user:{}", user.user_id),
            rate_limit::authenticated_tier(),
        ),
        None => {
            let ip = client_ip(request.headers(), request.extensions().get::<ConnectInfo<SocketAddr>>());
            (format!("ip:{}", ip), rate_limit::anonymous_tier())
        }
    };

    let allowed = match store::redis::shared().await {
        Some(kv) => rate_limit::check(kv, &identifier, tier).await,
        // No store: rate limiting is disabled, fail open
        None => true,
    };

    if !allowed {
        return reject(cfg.retry_after_secs);
    }

    let mut response = next.run(request).await;
    annotate(response.headers_mut(), tier);
    response
}

/// Originating client address: first X-Forwarded-For entry, else peer.
fn client_ip(headers: &HeaderMap, peer: Option<&ConnectInfo<SocketAddr>>) -> String {
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }
    peer.map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn reject(retry_after_secs: u64) -> Response {
    let mut response = ApiError::too_many_requests("Rate limit exceeded").into_response();
    if let Ok(value) = HeaderValue::from_str(&retry_after_secs.to_string()) {
        response.headers_mut().insert(header::RETRY_AFTER, value);
    }
    response
}

/// Informational headers: the configured capacity, rate and burst, not the
/// live remaining tokens. A known characteristic of this limiter.
fn annotate(headers: &mut HeaderMap, tier: Tier) {
    if let Ok(value) = HeaderValue::from_str(&tier.capacity.to_string()) {
        headers.insert("x-ratelimit-limit", value.clone());
        headers.insert("x-ratelimit-burst", value);
    }
    if let Ok(value) = HeaderValue::from_str(&format!("{:.1}/s", tier.rate)) {
        headers.insert("x-ratelimit-rate", value);
    }
}

//! Admission middleware for axum routes.
//!
//! Each protected route gets its own [`RateLimitContext`] (shared limiter,
//! route scope, policy). On admit the downstream handler runs exactly once;
//! on reject it never runs and the client gets a structured 429. The quota
//! headers are set on both paths, so clients always observe current state.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::header::RETRY_AFTER;
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::Serialize;
use tracing::warn;

use super::limiter::{FixedWindowLimiter, RateLimitDecision, RateLimitPolicy};

const LIMIT_HEADER: HeaderName = HeaderName::from_static("x-ratelimit-limit");
const REMAINING_HEADER: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
const RESET_HEADER: HeaderName = HeaderName::from_static("x-ratelimit-reset");

/// Per-route state handed to the admission middleware.
#[derive(Clone)]
pub struct RateLimitContext {
    limiter: Arc<FixedWindowLimiter>,
    scope: &'static str,
    policy: RateLimitPolicy,
}

impl RateLimitContext {
    /// Bind a limiter to one route scope and policy.
    pub fn new(
        limiter: Arc<FixedWindowLimiter>,
        scope: &'static str,
        policy: RateLimitPolicy,
    ) -> Self {
        Self {
            limiter,
            scope,
            policy,
        }
    }
}

/// Rejection body returned with a 429.
///
/// Deliberately narrow: no counter value and no key name are exposed.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RateLimitRejection {
    error: &'static str,
    message: &'static str,
    retry_after: u64,
}

/// The admission middleware itself.
pub async fn enforce(
    State(ctx): State<RateLimitContext>,
    request: Request,
    next: Next,
) -> Response {
    let identifier = client_identifier(&request);
    let outcome = ctx
        .limiter
        .check(ctx.scope, &identifier, &ctx.policy)
        .await;

    if let Some(warning) = &outcome.warning {
        warn!(
            scope = ctx.scope,
            identifier = %identifier,
            error = %warning,
            "rate limit check failed, admitting request"
        );
    }

    let decision = outcome.decision;

    if decision.allowed {
        let mut response = next.run(request).await;
        apply_quota_headers(response.headers_mut(), &decision);
        return response;
    }

    let retry_after = decision.retry_after(Utc::now());
    let body = RateLimitRejection {
        error: "Too many requests",
        message: "Rate limit exceeded. Please try again later.",
        retry_after,
    };

    let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
    apply_quota_headers(response.headers_mut(), &decision);
    if let Ok(value) = HeaderValue::from_str(&retry_after.to_string()) {
        response.headers_mut().insert(RETRY_AFTER, value);
    }
    response
}

/// Derive the rate-limit identifier for a request: the first hop of
/// `X-Forwarded-For` when present, otherwise the peer address.
fn client_identifier(request: &Request) -> String {
    if let Some(forwarded) = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
    {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn apply_quota_headers(headers: &mut HeaderMap, decision: &RateLimitDecision) {
    headers.insert(LIMIT_HEADER, HeaderValue::from(decision.limit));
    headers.insert(REMAINING_HEADER, HeaderValue::from(decision.remaining));
    if let Ok(value) = HeaderValue::from_str(&decision.reset_at.to_rfc3339()) {
        headers.insert(RESET_HEADER, value);
    }
}

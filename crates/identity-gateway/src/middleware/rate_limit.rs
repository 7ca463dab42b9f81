//! Rate-limiting middleware.
//!
//! Every request entering the gateway's API surface is counted against its
//! client identity (peer IP) in the shared store before any other work
//! happens. Standard limit/remaining/reset headers are attached to allowed
//! and denied responses alike; a denial is 429.
//!
//! If the shared store cannot be reached the request is refused (503): an
//! unreachable store must never silently admit unlimited traffic.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::instrument;

use crate::errors::IgError;
use crate::rate_limit::RateDecision;
use crate::routes::AppState;

const HEADER_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
const HEADER_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
const HEADER_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

fn apply_headers(response: &mut Response, decision: &RateDecision) {
    let headers = response.headers_mut();
    headers.insert(HEADER_LIMIT, HeaderValue::from(decision.limit));
    headers.insert(HEADER_REMAINING, HeaderValue::from(decision.remaining));
    headers.insert(
        HEADER_RESET,
        HeaderValue::from(decision.reset_after.as_secs()),
    );
}

/// Rate-limiting middleware applied in front of the API routes.
#[instrument(skip_all, name = "ig.middleware.rate_limit")]
pub async fn enforce_rate_limit(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    req: Request,
    next: Next,
) -> Result<Response, IgError> {
    let client_key = addr.ip().to_string();

    // Fail closed: a store error propagates as 503 and the request never
    // reaches a handler.
    let decision = state
        .rate_limiter
        .allow(&client_key, state.config.rate_quota)
        .await?;

    let mut response = if decision.allowed {
        next.run(req).await
    } else {
        IgError::RateLimited.into_response()
    };

    apply_headers(&mut response, &decision);
    Ok(response)
}

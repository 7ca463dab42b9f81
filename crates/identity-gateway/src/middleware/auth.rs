//! Authentication middleware for protected routes.
//!
//! Reads the access-credential cookie, verifies it against the presenting
//! client's agent string, and injects a typed [`RequestIdentity`] into
//! request extensions.

use axum::{
    extract::{Request, State},
    http::{header::USER_AGENT, HeaderMap},
    middleware::Next,
    response::IntoResponse,
};
use std::sync::Arc;
use tracing::instrument;

use crate::auth::AccessClaims;
use crate::cookies::{read_cookie, ACCESS_TOKEN_COOKIE};
use crate::errors::IgError;
use crate::routes::AppState;

/// The authenticated caller, produced by [`require_auth`] and threaded to
/// handlers through request extensions.
#[derive(Clone)]
pub struct RequestIdentity {
    pub user_id: String,
    pub claims: AccessClaims,
}

/// Extract the presenting client's agent string.
///
/// A missing or empty agent header is a client error (the caller failed to
/// identify its context) and is rejected before any credential is
/// inspected.
pub(crate) fn require_agent(headers: &HeaderMap) -> Result<String, IgError> {
    headers
        .get(USER_AGENT)
        .and_then(|h| h.to_str().ok())
        .filter(|agent| !agent.trim().is_empty())
        .map(ToString::to_string)
        .ok_or_else(|| {
            tracing::debug!(target: "ig.middleware.auth", "Missing client agent header");
            IgError::BadRequest("A client agent header is required".to_string())
        })
}

/// Authentication middleware that verifies access credentials.
///
/// # Response
///
/// - 400 if the agent header is missing or empty
/// - 401 if the credential cookie is missing or fails verification
/// - Continues to the next handler with [`RequestIdentity`] in extensions
///   otherwise
#[instrument(skip_all, name = "ig.middleware.auth")]
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<impl IntoResponse, IgError> {
    let agent = require_agent(req.headers())?;

    let token = read_cookie(req.headers(), ACCESS_TOKEN_COOKIE).ok_or_else(|| {
        tracing::debug!(target: "ig.middleware.auth", "Missing access credential cookie");
        IgError::AuthInvalid("Missing access credential".to_string())
    })?;

    let claims = state.token_issuer.verify(&token, &agent)?;

    req.extensions_mut().insert(RequestIdentity {
        user_id: claims.sub.clone(),
        claims,
    });

    Ok(next.run(req).await)
}

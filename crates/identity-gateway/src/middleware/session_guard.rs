//! Session-resolution middleware for routes that need an established
//! session (position reports).
//!
//! Resolves the `sid` cookie against the shared store and injects a typed
//! [`SessionContext`] into request extensions.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::IntoResponse,
};
use std::sync::Arc;
use tracing::instrument;

use crate::cookies::{read_cookie, SESSION_COOKIE};
use crate::errors::IgError;
use crate::routes::AppState;

/// The established session, produced by [`require_session`] and threaded to
/// handlers through request extensions.
#[derive(Clone)]
pub struct SessionContext {
    pub session_id: String,
    pub user_id: String,
}

/// Middleware requiring an established server-side session.
///
/// # Response
///
/// - 401 if the session cookie is missing or the session is unknown/expired
/// - 503 if the shared store cannot be reached
/// - Continues to the next handler with [`SessionContext`] in extensions
///   otherwise
#[instrument(skip_all, name = "ig.middleware.session")]
pub async fn require_session(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<impl IntoResponse, IgError> {
    let session_id = read_cookie(req.headers(), SESSION_COOKIE).ok_or_else(|| {
        tracing::debug!(target: "ig.middleware.session", "Missing session cookie");
        IgError::AuthInvalid("No established session".to_string())
    })?;

    let record = state.sessions.get(&session_id).await?.ok_or_else(|| {
        tracing::debug!(target: "ig.middleware.session", "Session unknown or expired");
        IgError::AuthInvalid("Session expired or unknown".to_string())
    })?;

    req.extensions_mut().insert(SessionContext {
        session_id,
        user_id: record.user_id,
    });

    Ok(next.run(req).await)
}

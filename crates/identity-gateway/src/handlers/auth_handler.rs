//! Authentication endpoints: register, login, refresh, logout, and the
//! identity echo.
//!
//! Credential transport follows one rule: the signed access credential and
//! the session id travel as hardened cookies; the refresh handle travels in
//! the JSON body (`_rft`) on issuance and in the `Authorization` header on
//! use. The two never share a channel.

use axum::{
    extract::{Extension, State},
    http::{
        header::{AUTHORIZATION, SET_COOKIE},
        HeaderMap, StatusCode,
    },
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use common::secret::{ExposeSecret, SecretString};

use crate::auth::token_issuer::ACCESS_TOKEN_TTL_SECONDS;
use crate::cookies::{build_cookie, clear_cookie, read_cookie, ACCESS_TOKEN_COOKIE, SESSION_COOKIE};
use crate::errors::IgError;
use crate::middleware::auth::{require_agent, RequestIdentity};
use crate::routes::AppState;
use crate::services::auth_service::{self, IssuedSession};
use crate::session::SESSION_TTL;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub display_name: String,
    pub password: SecretString,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: SecretString,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UserSummary {
    id: String,
    email: String,
    display_name: String,
}

/// Body of a successful registration or login. The refresh handle rides
/// under `_rft`, out-of-band from the credential cookie.
#[derive(Serialize)]
struct SessionResponse {
    user: UserSummary,
    #[serde(rename = "_rft")]
    refresh_handle: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshResponse {
    expires_in: i64,
}

fn set_cookie_value(cookie: String) -> Result<axum::http::HeaderValue, IgError> {
    cookie.parse().map_err(|_| {
        tracing::error!(target: "ig.handlers.auth", "Failed to render Set-Cookie header");
        IgError::Internal
    })
}

fn session_response(issued: IssuedSession, status: StatusCode) -> Result<Response, IgError> {
    let body = SessionResponse {
        user: UserSummary {
            id: issued.user.user_id,
            email: issued.user.email,
            display_name: issued.user.display_name,
        },
        refresh_handle: issued.refresh_handle,
    };

    let mut response = (status, Json(body)).into_response();
    let headers = response.headers_mut();

    // Safe cast: the TTL constant is positive
    #[allow(clippy::cast_sign_loss)]
    let token_ttl = Duration::from_secs(ACCESS_TOKEN_TTL_SECONDS as u64);

    headers.append(
        SET_COOKIE,
        set_cookie_value(build_cookie(
            ACCESS_TOKEN_COOKIE,
            &issued.access_token,
            token_ttl,
        ))?,
    );
    headers.append(
        SET_COOKIE,
        set_cookie_value(build_cookie(SESSION_COOKIE, &issued.session_id, SESSION_TTL))?,
    );

    Ok(response)
}

/// Extract the refresh handle from `Authorization: Bearer <handle>`.
fn bearer_handle(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .filter(|handle| !handle.is_empty())
        .map(ToString::to_string)
}

/// `POST /v1/auth/register`
pub async fn register(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<RegisterRequest>,
) -> Result<Response, IgError> {
    let agent = require_agent(&headers)?;

    let issued = auth_service::register(
        state.users.as_ref(),
        &state.token_issuer,
        &state.refresh_registry,
        &state.sessions,
        &body.email,
        &body.display_name,
        body.password.expose_secret(),
        &agent,
    )
    .await?;

    session_response(issued, StatusCode::CREATED)
}

/// `POST /v1/auth/login`
pub async fn login(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<LoginRequest>,
) -> Result<Response, IgError> {
    let agent = require_agent(&headers)?;

    let issued = auth_service::login(
        state.users.as_ref(),
        &state.token_issuer,
        &state.refresh_registry,
        &state.sessions,
        &body.email,
        body.password.expose_secret(),
        &agent,
    )
    .await?;

    session_response(issued, StatusCode::OK)
}

/// `POST /v1/auth/refresh`
///
/// Requires `Authorization: Bearer <handle>` and a non-empty agent header;
/// the agent check comes first, before the registry is consulted.
pub async fn refresh(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, IgError> {
    let agent = require_agent(&headers)?;

    let handle = bearer_handle(&headers)
        .ok_or_else(|| IgError::AuthInvalid("Missing refresh handle".to_string()))?;

    let session_id = read_cookie(&headers, SESSION_COOKIE);

    let access_token = auth_service::refresh(
        &state.token_issuer,
        &state.refresh_registry,
        &state.sessions,
        &handle,
        &agent,
        session_id.as_deref(),
    )
    .await?;

    let mut response = (
        StatusCode::OK,
        Json(RefreshResponse {
            expires_in: ACCESS_TOKEN_TTL_SECONDS,
        }),
    )
        .into_response();

    #[allow(clippy::cast_sign_loss)]
    let token_ttl = Duration::from_secs(ACCESS_TOKEN_TTL_SECONDS as u64);

    response.headers_mut().append(
        SET_COOKIE,
        set_cookie_value(build_cookie(ACCESS_TOKEN_COOKIE, &access_token, token_ttl))?,
    );

    Ok(response)
}

/// `POST /v1/auth/logout`
///
/// Revokes the presented handle and destroys the session, then clears both
/// cookies. Cleanup is best-effort: cookies are cleared and 204 returned
/// even if a deletion fails server-side.
pub async fn logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, IgError> {
    let handle = bearer_handle(&headers);
    let session_id = read_cookie(&headers, SESSION_COOKIE);

    auth_service::logout(
        &state.refresh_registry,
        &state.sessions,
        handle.as_deref(),
        session_id.as_deref(),
    )
    .await;

    let mut response = StatusCode::NO_CONTENT.into_response();
    let headers = response.headers_mut();
    headers.append(SET_COOKIE, set_cookie_value(clear_cookie(ACCESS_TOKEN_COOKIE))?);
    headers.append(SET_COOKIE, set_cookie_value(clear_cookie(SESSION_COOKIE))?);

    Ok(response)
}

#[derive(Serialize)]
struct MeResponse {
    id: String,
}

/// `GET /v1/me`: identity echo for authenticated callers.
pub async fn me(Extension(identity): Extension<RequestIdentity>) -> Json<impl Serialize> {
    Json(MeResponse {
        id: identity.user_id,
    })
}

//! Identity gateway error types.
//!
//! All errors map to appropriate HTTP status codes via the `IntoResponse`
//! impl. Error messages returned to clients are intentionally generic to
//! avoid leaking internal details. Actual errors are logged server-side.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::store::StoreError;

/// Identity gateway error type.
///
/// Maps to appropriate HTTP status codes:
/// - AuthInvalid: 401 Unauthorized
/// - BadRequest: 400 Bad Request
/// - Conflict: 409 Conflict
/// - NotFound: 404 Not Found
/// - RateLimited: 429 Too Many Requests
/// - Store: 503 Service Unavailable (the shared store is the single point of
///   truth for sessions, refresh handles, and quotas; when it is down the
///   gateway fails closed, never open)
/// - Internal: 500 Internal Server Error
#[derive(Debug, Error)]
pub enum IgError {
    #[error("Invalid credential: {0}")]
    AuthInvalid(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("Shared store unavailable: {0}")]
    Store(String),

    #[error("Internal server error")]
    Internal,
}

impl IgError {
    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            IgError::AuthInvalid(_) => 401,
            IgError::BadRequest(_) => 400,
            IgError::Conflict(_) => 409,
            IgError::NotFound(_) => 404,
            IgError::RateLimited => 429,
            IgError::Store(_) => 503,
            IgError::Internal => 500,
        }
    }
}

impl From<StoreError> for IgError {
    fn from(err: StoreError) -> Self {
        IgError::Store(err.to_string())
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

impl IntoResponse for IgError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            IgError::AuthInvalid(reason) => (
                StatusCode::UNAUTHORIZED,
                "INVALID_CREDENTIAL",
                reason.clone(),
            ),
            IgError::BadRequest(reason) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", reason.clone())
            }
            IgError::Conflict(reason) => (StatusCode::CONFLICT, "CONFLICT", reason.clone()),
            IgError::NotFound(resource) => (StatusCode::NOT_FOUND, "NOT_FOUND", resource.clone()),
            IgError::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                "RATE_LIMIT_EXCEEDED",
                "Too many requests. Please try again later.".to_string(),
            ),
            IgError::Store(reason) => {
                // Log actual reason server-side, return generic message to client
                tracing::error!(target: "ig.store", reason = %reason, "Shared store unavailable");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "STORE_UNAVAILABLE",
                    "Service temporarily unavailable".to_string(),
                )
            }
            IgError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            ),
        };

        let error_response = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };

        let mut response = (status, Json(error_response)).into_response();

        // Add WWW-Authenticate header for 401 responses
        if status == StatusCode::UNAUTHORIZED {
            if let Ok(header_value) = "Bearer realm=\"beacon-api\", error=\"invalid_token\"".parse()
            {
                response
                    .headers_mut()
                    .insert("WWW-Authenticate", header_value);
            }
        }

        response
    }
}

//! Health check endpoint.

use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::errors::IgError;
use crate::routes::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub store: &'static str,
}

/// `GET /v1/health`: pings the shared store.
///
/// A gateway that cannot reach the store cannot authenticate, refresh, or
/// rate-limit anything, so store failure makes the whole instance unhealthy
/// (503), not degraded-but-serving.
pub async fn health_check(State(state): State<Arc<AppState>>) -> Result<Json<HealthResponse>, IgError> {
    state.store.ping().await?;

    Ok(Json(HealthResponse {
        status: "healthy",
        store: "healthy",
    }))
}

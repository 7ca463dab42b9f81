//! Position-report endpoint.

use axum::{
    extract::{Extension, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::errors::IgError;
use crate::middleware::session_guard::SessionContext;
use crate::routes::AppState;
use crate::session::PositionOutcome;

#[derive(Debug, Deserialize)]
pub struct PositionReport {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Serialize)]
struct PositionAck {
    status: &'static str,
}

fn validate_coordinates(lat: f64, lng: f64) -> Result<(), IgError> {
    if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
        return Err(IgError::BadRequest(
            "lat must be within [-90, 90]".to_string(),
        ));
    }
    if !lng.is_finite() || !(-180.0..=180.0).contains(&lng) {
        return Err(IgError::BadRequest(
            "lng must be within [-180, 180]".to_string(),
        ));
    }
    Ok(())
}

/// `POST /v1/positions`
///
/// Requires an established session. 200 when the report is accepted, 409
/// when the velocity check rejects it (the stored baseline is left as it
/// was).
pub async fn report_position(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<SessionContext>,
    Json(body): Json<PositionReport>,
) -> Result<Response, IgError> {
    validate_coordinates(body.lat, body.lng)?;

    let outcome = state
        .position_guard
        .report_position(&session.session_id, body.lat, body.lng, Utc::now())
        .await?;

    match outcome {
        PositionOutcome::Accepted => {
            Ok((StatusCode::OK, Json(PositionAck { status: "accepted" })).into_response())
        }
        PositionOutcome::Rejected => Err(IgError::Conflict(
            "Reported position implies implausible travel speed".to_string(),
        )),
    }
}

//! Status handler.

use super::StatusResponse;
use crate::api::AppState;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};

/// GET /status - Stored backups, recent log lines and the next scheduled run
#[utoipa::path(
    get,
    path = "/api/v1/status",
    tag = "status",
    responses(
        (status = 200, description = "Backups newest first and the tail of the operation log", body = StatusResponse),
        (status = 500, description = "Backup directory or log could not be read", body = crate::error::ApiError)
    )
)]
pub async fn get_status(State(state): State<AppState>) -> impl IntoResponse {
    let report = match state.service.status().await {
        Ok(report) => report,
        Err(e) => return e.into_response(),
    };
    let schedule = state.service.schedule_status().await;

    (StatusCode::OK, Json(StatusResponse { report, schedule })).into_response()
}

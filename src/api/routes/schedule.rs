//! Daily schedule handlers.

use super::{CancelResponse, DeviceRecord, ScheduleRequest};
use crate::api::AppState;
use crate::types::RawRecord;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};

/// GET /schedule - Current daily schedule
#[utoipa::path(
    get,
    path = "/api/v1/schedule",
    tag = "schedule",
    responses(
        (status = 200, description = "Current schedule; `next_run` is null when idle", body = crate::schedule::ScheduleStatus)
    )
)]
pub async fn get_schedule(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.service.schedule_status().await)
}

/// PUT /schedule - Set or replace the daily schedule
#[utoipa::path(
    put,
    path = "/api/v1/schedule",
    tag = "schedule",
    request_body(content = ScheduleRequest, description = "Time of day and devices"),
    responses(
        (status = 200, description = "Schedule installed", body = crate::schedule::ScheduledJob),
        (status = 400, description = "Time out of range or no devices", body = crate::error::ApiError),
        (status = 422, description = "A device record is invalid", body = crate::error::ApiError),
        (status = 503, description = "Service is shutting down", body = crate::error::ApiError)
    )
)]
pub async fn set_schedule(
    State(state): State<AppState>,
    Json(request): Json<ScheduleRequest>,
) -> impl IntoResponse {
    let records: Vec<RawRecord> = request
        .devices
        .into_iter()
        .map(|DeviceRecord(record)| record)
        .collect();

    match state
        .service
        .schedule(request.hour, request.minute, &records)
        .await
    {
        Ok(job) => (StatusCode::OK, Json(job)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// DELETE /schedule - Cancel the daily schedule
#[utoipa::path(
    delete,
    path = "/api/v1/schedule",
    tag = "schedule",
    responses(
        (status = 200, description = "Schedule cancelled, or there was nothing to cancel", body = CancelResponse)
    )
)]
pub async fn cancel_schedule(State(state): State<AppState>) -> impl IntoResponse {
    let outcome = state.service.cancel_schedule().await;
    Json(CancelResponse {
        outcome,
        message: outcome.message().to_string(),
    })
}

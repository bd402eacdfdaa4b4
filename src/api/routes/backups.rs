//! Backup handlers.

use super::{BatchUploadRequest, DeviceRecord};
use crate::api::AppState;
use crate::error::Error;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};

/// POST /backups - Back up one device now
#[utoipa::path(
    post,
    path = "/api/v1/backups",
    tag = "backups",
    request_body(content = DeviceRecord, description = "Device address and credentials"),
    responses(
        (status = 200, description = "Backup attempted; see status for the result", body = crate::types::BackupOutcome),
        (status = 422, description = "Record is missing a required field", body = crate::error::ApiError),
        (status = 503, description = "Service is shutting down", body = crate::error::ApiError)
    )
)]
pub async fn backup_device(
    State(state): State<AppState>,
    Json(DeviceRecord(record)): Json<DeviceRecord>,
) -> impl IntoResponse {
    match state.service.backup_device(&record).await {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// POST /backups/batch - Back up every device in an uploaded list
#[utoipa::path(
    post,
    path = "/api/v1/backups/batch",
    tag = "backups",
    request_body(content = BatchUploadRequest, description = "Uploaded device list"),
    responses(
        (status = 200, description = "Batch ran; one outcome per device in upload order", body = crate::types::BatchReport),
        (status = 415, description = "Unsupported file type", body = crate::error::ApiError),
        (status = 422, description = "Upload could not be decoded or a record is invalid", body = crate::error::ApiError),
        (status = 503, description = "Service is shutting down", body = crate::error::ApiError)
    )
)]
pub async fn backup_batch(
    State(state): State<AppState>,
    Json(request): Json<BatchUploadRequest>,
) -> impl IntoResponse {
    let format = match request.resolve_format() {
        Ok(format) => format,
        Err(e) => return Error::from(e).into_response(),
    };

    match state.service.backup_upload(&request.content, format).await {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(e) => e.into_response(),
    }
}

//! Route handlers for the REST API
//!
//! Handlers are organized by domain:
//! - [`backups`] - Manual and uploaded backups
//! - [`schedule`] - The daily schedule slot
//! - [`status`] - Stored backups and recent log
//! - [`system`] - Health, events, OpenAPI

use crate::error::ValidationError;
use crate::schedule::{CancelOutcome, ScheduleStatus};
use crate::status::StatusReport;
use crate::types::RawRecord;
use crate::validation::BatchFormat;
use serde::{Deserialize, Serialize};

mod backups;
mod schedule;
mod status;
mod system;

pub use backups::*;
pub use schedule::*;
pub use status::*;
pub use system::*;

// ============================================================================
// Request/Response Types (shared across handlers)
// ============================================================================

/// One device record, e.g. `{"ip": "10.0.0.1", "username": "admin", "password": "..."}`
///
/// Accepted keys: `ip` or `address`, `username`, `password`, and optionally
/// `device_type`.
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(transparent)]
pub struct DeviceRecord(pub RawRecord);

/// Request body for POST /backups/batch
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct BatchUploadRequest {
    /// Format of `content`; derived from `filename` when omitted
    #[serde(default)]
    pub format: Option<BatchFormat>,
    /// Original file name of the upload (`.csv`, `.yaml`, `.yml`, `.json`)
    #[serde(default)]
    pub filename: Option<String>,
    /// The uploaded document
    pub content: String,
}

impl BatchUploadRequest {
    /// Explicit format, else the one implied by the file name
    pub fn resolve_format(&self) -> Result<BatchFormat, ValidationError> {
        match (self.format, self.filename.as_deref()) {
            (Some(format), _) => Ok(format),
            (None, Some(name)) => BatchFormat::from_file_name(name),
            (None, None) => Err(ValidationError::UnsupportedFormat(
                "no format or filename given".to_string(),
            )),
        }
    }
}

/// Request body for PUT /schedule
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct ScheduleRequest {
    /// Hour of day (0-23), local time
    pub hour: u32,
    /// Minute of hour (0-59)
    pub minute: u32,
    /// Devices to back up on each firing
    pub devices: Vec<DeviceRecord>,
}

/// Response for DELETE /schedule
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct CancelResponse {
    /// What happened
    pub outcome: CancelOutcome,
    /// Operator-facing message
    pub message: String,
}

/// Response for GET /status
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct StatusResponse {
    /// Stored backups and recent log lines
    #[serde(flatten)]
    pub report: StatusReport,
    /// Current schedule
    pub schedule: ScheduleStatus,
}

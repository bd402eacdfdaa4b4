//! Error types for netbackup
//!
//! This module provides error handling for the library, including:
//! - Domain-specific error types (Validation, Device, Persistence, Schedule)
//! - HTTP status code mapping for API integration
//! - Structured error responses with machine-readable error codes

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use utoipa::ToSchema;

/// Result type alias for netbackup operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for netbackup
///
/// Validation and schedule errors reach the caller directly. Device and
/// persistence errors are captured by the backup executor and only ever
/// surface as a failed [`BackupOutcome`](crate::types::BackupOutcome).
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "backup_dir")
        key: Option<String>,
    },

    /// Device batch failed validation (nothing was executed)
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Connection, authentication or command failure on one device
    #[error("device error: {0}")]
    Device(#[from] DeviceError),

    /// Artifact could not be written
    #[error("persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    /// Schedule request rejected
    #[error("schedule error: {0}")]
    Schedule(#[from] ScheduleError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),

    /// Shutdown in progress - not accepting new work
    #[error("shutdown in progress: not accepting new backups")]
    ShuttingDown,

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Batch validation errors
///
/// Validation is fail-fast: the first bad record aborts the whole batch.
/// Record numbers are 1-based, matching what an operator sees in the file.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// The batch contained no records at all
    #[error("batch contains no devices")]
    EmptyBatch,

    /// A required field was absent or blank
    #[error("record {record}: missing required field '{field}'")]
    MissingField {
        /// 1-based position of the offending record
        record: usize,
        /// Name of the missing field
        field: &'static str,
    },

    /// The document did not decode to a sequence of records
    #[error("batch must contain a list of devices, found {found}")]
    NotASequence {
        /// Description of what was found instead
        found: String,
    },

    /// One entry of the sequence was not a key/value record
    #[error("record {record} is malformed: {reason}")]
    MalformedRecord {
        /// 1-based position of the offending record
        record: usize,
        /// Why the record could not be read
        reason: String,
    },

    /// The upload could not be parsed in its declared format
    #[error("could not decode batch: {0}")]
    Decode(String),

    /// The upload has a format we do not accept
    #[error("unsupported batch format: {0}")]
    UnsupportedFormat(String),
}

/// Per-device failures reported by a device session
///
/// These never abort a batch; the executor folds them into a failed outcome.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DeviceError {
    /// The device could not be reached
    #[error("connection failed: {0}")]
    Connect(String),

    /// The device rejected the credentials
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// A command was rejected or produced an error
    #[error("command '{command}' failed: {reason}")]
    Command {
        /// The command that was sent
        command: String,
        /// Device or transport provided reason
        reason: String,
    },

    /// Any other session-level failure (e.g. disconnect)
    #[error("session error: {0}")]
    Session(String),

    /// A session stage did not finish in time
    #[error("{stage} timed out after {}s", after.as_secs())]
    Timeout {
        /// The stage that timed out ("connect", "command", "close")
        stage: &'static str,
        /// The bound that was exceeded
        after: Duration,
    },

    /// No session slot could be obtained
    #[error("session capacity unavailable: {0}")]
    Unavailable(String),
}

/// Artifact store failures
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// The backup directory could not be created
    #[error("failed to create backup directory {path}: {reason}")]
    CreateDir {
        /// Directory that could not be created
        path: PathBuf,
        /// Underlying cause
        reason: String,
    },

    /// The artifact file could not be written
    #[error("failed to write {path}: {reason}")]
    Write {
        /// File that could not be written
        path: PathBuf,
        /// Underlying cause
        reason: String,
    },
}

/// Schedule controller rejections
///
/// A rejected request leaves the schedule slot untouched.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ScheduleError {
    /// Hour or minute out of range
    #[error("invalid time {hour:02}:{minute:02}: hour must be 0-23 and minute 0-59")]
    InvalidTime {
        /// Requested hour
        hour: u32,
        /// Requested minute
        minute: u32,
    },

    /// A schedule needs at least one device
    #[error("a schedule needs at least one device")]
    NoDevices,

    /// The controller has been shut down
    #[error("scheduler is shut down")]
    ShuttingDown,
}

/// API error response format
///
/// # Example JSON Response
///
/// ```json
/// {
///   "error": {
///     "code": "invalid_time",
///     "message": "schedule error: invalid time 25:00: hour must be 0-23 and minute 0-59",
///     "details": { "hour": 25, "minute": 0 }
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// The error details
    pub error: ErrorDetail,
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "missing_field", "invalid_time")
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional context about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with code and message
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    /// Create a "validation error" error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new("validation_error", message)
    }

    /// Create an "internal server error"
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new("internal_error", message)
    }
}

/// Convert errors to HTTP status codes for API responses
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - Client error (invalid input)
            Error::Config { .. } => 400,
            Error::Schedule(ScheduleError::InvalidTime { .. }) => 400,
            Error::Schedule(ScheduleError::NoDevices) => 400,

            // 415 Unsupported Media Type
            Error::Validation(ValidationError::UnsupportedFormat(_)) => 415,

            // 422 Unprocessable Entity - input decoded but not a valid batch
            Error::Validation(_) => 422,

            // 502 Bad Gateway - the device misbehaved
            Error::Device(_) => 502,

            // 500 Internal Server Error - Server-side issues
            Error::Persistence(_) => 500,
            Error::Io(_) => 500,
            Error::Serialization(_) => 500,
            Error::ApiServerError(_) => 500,
            Error::Other(_) => 500,

            // 503 Service Unavailable
            Error::ShuttingDown => 503,
            Error::Schedule(ScheduleError::ShuttingDown) => 503,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Validation(e) => match e {
                ValidationError::EmptyBatch => "empty_batch",
                ValidationError::MissingField { .. } => "missing_field",
                ValidationError::NotASequence { .. } => "invalid_shape",
                ValidationError::MalformedRecord { .. } => "malformed_record",
                ValidationError::Decode(_) => "decode_error",
                ValidationError::UnsupportedFormat(_) => "unsupported_format",
            },
            Error::Device(_) => "device_error",
            Error::Persistence(_) => "persistence_error",
            Error::Schedule(e) => match e {
                ScheduleError::InvalidTime { .. } => "invalid_time",
                ScheduleError::NoDevices => "no_devices",
                ScheduleError::ShuttingDown => "shutting_down",
            },
            Error::Io(_) => "io_error",
            Error::Serialization(_) => "serialization_error",
            Error::ApiServerError(_) => "api_server_error",
            Error::ShuttingDown => "shutting_down",
            Error::Other(_) => "internal_error",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let code = error.error_code().to_string();
        let message = error.to_string();

        let details = match &error {
            Error::Config { key: Some(key), .. } => Some(serde_json::json!({ "key": key })),
            Error::Validation(ValidationError::MissingField { record, field }) => {
                Some(serde_json::json!({
                    "record": record,
                    "field": field,
                }))
            }
            Error::Validation(ValidationError::MalformedRecord { record, .. }) => {
                Some(serde_json::json!({ "record": record }))
            }
            Error::Schedule(ScheduleError::InvalidTime { hour, minute }) => {
                Some(serde_json::json!({
                    "hour": hour,
                    "minute": minute,
                }))
            }
            Error::Persistence(PersistenceError::Write { path, .. }) => {
                Some(serde_json::json!({ "path": path }))
            }
            _ => None,
        };

        ApiError {
            error: ErrorDetail {
                code,
                message,
                details,
            },
        }
    }
}

//! OpenAPI documentation and schema generation

use utoipa::OpenApi;

/// OpenAPI documentation for the netbackup REST API
///
/// Served at `/api/v1/openapi.json` and, when enabled, browsable at
/// `/swagger-ui`.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "netbackup REST API",
        version = "0.1.0",
        description = "Back up network device configurations on demand or on a daily schedule",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:5000/api/v1", description = "Local server")
    ),
    paths(
        // Backups
        crate::api::routes::backup_device,
        crate::api::routes::backup_batch,

        // Schedule
        crate::api::routes::get_schedule,
        crate::api::routes::set_schedule,
        crate::api::routes::cancel_schedule,

        // Status
        crate::api::routes::get_status,

        // System
        crate::api::routes::health_check,
        crate::api::routes::openapi_spec,
        crate::api::routes::event_stream,
    ),
    components(schemas(
        crate::types::BackupOutcome,
        crate::types::BatchOrigin,
        crate::types::BatchReport,
        crate::types::Event,
        crate::validation::BatchFormat,
        crate::artifacts::ArtifactEntry,
        crate::status::StatusReport,
        crate::schedule::ScheduledJob,
        crate::schedule::ScheduleStatus,
        crate::schedule::SlotState,
        crate::schedule::CancelOutcome,

        crate::api::routes::DeviceRecord,
        crate::api::routes::BatchUploadRequest,
        crate::api::routes::ScheduleRequest,
        crate::api::routes::CancelResponse,
        crate::api::routes::StatusResponse,

        crate::error::ApiError,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "backups", description = "Back up one device or an uploaded device list"),
        (name = "schedule", description = "Daily recurring backup of a fixed device list"),
        (name = "status", description = "Stored backups and the operation log"),
        (name = "system", description = "Health checks, OpenAPI spec, events"),
    )
)]
pub struct ApiDoc;

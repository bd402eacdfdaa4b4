//! Core types for netbackup

use chrono::{DateTime, Local};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use utoipa::ToSchema;

/// One undecoded device record as it arrives from an upload or form
///
/// Keys are field names (`ip`/`address`, `username`, `password`,
/// `device_type`); values are their textual content.
pub type RawRecord = HashMap<String, String>;

/// Validated identity and credentials of one backup target
///
/// Only [`BatchValidator`](crate::validation::BatchValidator) builds these
/// from untrusted input. The password is held as a secret: it is redacted
/// from `Debug` output and never serialized.
#[derive(Clone)]
pub struct DeviceDescriptor {
    address: String,
    username: String,
    password: Secret<String>,
    device_kind: String,
}

impl DeviceDescriptor {
    /// Assemble a descriptor from already-checked parts
    pub(crate) fn from_parts(
        address: String,
        username: String,
        password: String,
        device_kind: String,
    ) -> Self {
        Self {
            address,
            username,
            password: Secret::new(password),
            device_kind,
        }
    }

    /// Management address (IP or hostname) of the device
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Login name
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Login password
    ///
    /// Hand this to the transport only; never log it.
    pub fn password(&self) -> &str {
        self.password.expose_secret()
    }

    /// Platform tag understood by the session connector (e.g. "cisco_ios")
    pub fn device_kind(&self) -> &str {
        &self.device_kind
    }
}

impl fmt::Debug for DeviceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceDescriptor")
            .field("address", &self.address)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("device_kind", &self.device_kind)
            .finish()
    }
}

/// Result of one device's backup attempt
///
/// Either the configuration was persisted as an artifact, or the attempt
/// failed with a message. Never both, never neither.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BackupOutcome {
    /// Configuration retrieved and written to disk
    Saved {
        /// Device address
        address: String,
        /// Artifact file name (`{address}_{timestamp}.cfg`)
        filename: String,
        /// Full artifact path
        #[schema(value_type = String)]
        path: PathBuf,
    },
    /// Backup failed at some stage
    Failed {
        /// Device address
        address: String,
        /// Failure detail including the address and the underlying cause
        message: String,
    },
}

impl BackupOutcome {
    /// Address of the device this outcome belongs to
    pub fn address(&self) -> &str {
        match self {
            BackupOutcome::Saved { address, .. } | BackupOutcome::Failed { address, .. } => address,
        }
    }

    /// Whether an artifact was persisted
    pub fn succeeded(&self) -> bool {
        matches!(self, BackupOutcome::Saved { .. })
    }

    /// Human-readable detail: saved filename on success, failure detail on error
    pub fn message(&self) -> String {
        match self {
            BackupOutcome::Saved { filename, .. } => format!("Backup saved as {filename}"),
            BackupOutcome::Failed { message, .. } => message.clone(),
        }
    }
}

/// What started a batch
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum BatchOrigin {
    /// Single device submitted by hand
    Manual,
    /// Uploaded device list
    Upload,
    /// Fired by the recurring schedule
    Scheduled,
}

impl fmt::Display for BatchOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BatchOrigin::Manual => "manual",
            BatchOrigin::Upload => "upload",
            BatchOrigin::Scheduled => "scheduled",
        };
        f.write_str(s)
    }
}

/// Aggregated outcomes of one batch run, in input order
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct BatchReport {
    /// What triggered the batch
    pub origin: BatchOrigin,
    /// One outcome per device, in the order the devices were given
    pub outcomes: Vec<BackupOutcome>,
    /// Number of saved artifacts
    pub succeeded: usize,
    /// Number of failed devices
    pub failed: usize,
}

impl BatchReport {
    /// Build a report, counting successes and failures
    pub fn new(origin: BatchOrigin, outcomes: Vec<BackupOutcome>) -> Self {
        let succeeded = outcomes.iter().filter(|o| o.succeeded()).count();
        let failed = outcomes.len() - succeeded;
        Self {
            origin,
            outcomes,
            succeeded,
            failed,
        }
    }
}

/// Event emitted during backup and schedule lifecycle
///
/// Events never carry credentials.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A device backup attempt started
    BackupStarted {
        /// Device address
        address: String,
    },

    /// A device backup produced an artifact
    BackupSucceeded {
        /// Device address
        address: String,
        /// Artifact file name
        filename: String,
    },

    /// A device backup failed
    BackupFailed {
        /// Device address
        address: String,
        /// Failure detail
        message: String,
    },

    /// A batch finished
    BatchCompleted {
        /// What triggered the batch
        origin: BatchOrigin,
        /// Devices backed up successfully
        succeeded: usize,
        /// Devices that failed
        failed: usize,
    },

    /// A recurring schedule was created or replaced
    ScheduleSet {
        /// Hour of day (0-23)
        hour: u32,
        /// Minute of hour (0-59)
        minute: u32,
        /// Number of devices bound to the schedule
        device_count: usize,
        /// Next firing time
        #[schema(value_type = String)]
        next_run: DateTime<Local>,
    },

    /// The recurring schedule was cancelled
    ScheduleCancelled,

    /// The recurring schedule fired
    ScheduleFired {
        /// Number of devices in the fired batch
        device_count: usize,
    },

    /// Service is shutting down
    Shutdown,
}

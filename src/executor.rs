//! Single-device backup execution
//!
//! [`BackupExecutor::execute`] drives one device through open → enable →
//! backup command → close → write artifact, and always hands back a
//! [`BackupOutcome`]. Connection, authentication, command, close and write
//! failures (and a panicking connector) are all folded into
//! [`BackupOutcome::Failed`]; nothing escapes to the caller.
//!
//! Each call is exactly one attempt. Retry policy belongs to the caller,
//! see [`crate::retry`].

use crate::artifacts::{ArtifactStore, SavedArtifact};
use crate::config::SessionConfig;
use crate::error::{DeviceError, Error};
use crate::session::{DeviceSession, SessionConnector};
use crate::types::{BackupOutcome, DeviceDescriptor, Event};
use chrono::Utc;
use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Semaphore, broadcast};
use tracing::{error, info, warn};

/// Backs up one device per call
pub struct BackupExecutor {
    connector: Arc<dyn SessionConnector>,
    store: ArtifactStore,
    settings: SessionConfig,
    /// Process-wide bound on open sessions, shared by every batch
    session_limit: Arc<Semaphore>,
    event_tx: broadcast::Sender<Event>,
}

impl BackupExecutor {
    /// Create an executor
    ///
    /// `session_limit` is shared with every other executor that should count
    /// against the same process-wide session budget.
    pub fn new(
        connector: Arc<dyn SessionConnector>,
        store: ArtifactStore,
        settings: SessionConfig,
        session_limit: Arc<Semaphore>,
        event_tx: broadcast::Sender<Event>,
    ) -> Self {
        Self {
            connector,
            store,
            settings,
            session_limit,
            event_tx,
        }
    }

    /// Artifact store receiving successful backups
    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Back up one device and report the outcome
    ///
    /// Never fails: every error becomes a [`BackupOutcome::Failed`] carrying
    /// the device address and the cause. Logs one line and emits one event
    /// per call.
    pub async fn execute(&self, device: &DeviceDescriptor) -> BackupOutcome {
        let result = self.attempt(device).await;
        self.record(device, result)
    }

    /// Make one backup attempt without recording the outcome
    ///
    /// This is the unit a retry policy wraps. Pass the final result to
    /// [`record`](Self::record) to obtain the outcome and log it.
    pub async fn attempt(&self, device: &DeviceDescriptor) -> Result<SavedArtifact, Error> {
        match AssertUnwindSafe(self.attempt_inner(device))
            .catch_unwind()
            .await
        {
            Ok(result) => result,
            Err(panic) => Err(Error::Other(format!(
                "device session panicked: {}",
                panic_detail(panic.as_ref())
            ))),
        }
    }

    /// Turn an attempt result into an outcome, logging it and emitting an event
    ///
    /// The log line carries address, user and platform, never the password.
    pub fn record(
        &self,
        device: &DeviceDescriptor,
        result: Result<SavedArtifact, Error>,
    ) -> BackupOutcome {
        match result {
            Ok(saved) => {
                info!(
                    address = %device.address(),
                    username = %device.username(),
                    device_kind = %device.device_kind(),
                    filename = %saved.filename,
                    "Backup successful for {}",
                    device.address()
                );
                let _ = self.event_tx.send(Event::BackupSucceeded {
                    address: device.address().to_string(),
                    filename: saved.filename.clone(),
                });
                BackupOutcome::Saved {
                    address: device.address().to_string(),
                    filename: saved.filename,
                    path: saved.path,
                }
            }
            Err(e) => {
                let message = format!(
                    "Failed to backup {}: {}",
                    device.address(),
                    failure_detail(&e)
                );
                error!(
                    address = %device.address(),
                    username = %device.username(),
                    device_kind = %device.device_kind(),
                    "{message}"
                );
                let _ = self.event_tx.send(Event::BackupFailed {
                    address: device.address().to_string(),
                    message: message.clone(),
                });
                BackupOutcome::Failed {
                    address: device.address().to_string(),
                    message,
                }
            }
        }
    }

    async fn attempt_inner(&self, device: &DeviceDescriptor) -> Result<SavedArtifact, Error> {
        let permit = self
            .session_limit
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| DeviceError::Unavailable("session limiter closed".into()))?;

        let _ = self.event_tx.send(Event::BackupStarted {
            address: device.address().to_string(),
        });

        let mut session = bounded(
            "connect",
            self.settings.connect_timeout,
            self.connector.open(device),
        )
        .await?;

        // A panicking session is still closed
        let fetched = match AssertUnwindSafe(self.fetch_config(session.as_mut()))
            .catch_unwind()
            .await
        {
            Ok(result) => result,
            Err(panic) => Err(DeviceError::Session(format!(
                "device session panicked: {}",
                panic_detail(panic.as_ref())
            ))),
        };
        let closed = bounded(
            "close",
            self.settings.connect_timeout,
            session.close(),
        )
        .await;
        drop(session);
        drop(permit);

        let text = match (fetched, closed) {
            (Ok(text), Ok(())) => text,
            (Ok(_), Err(close_err)) => return Err(close_err.into()),
            (Err(fetch_err), Ok(())) => return Err(fetch_err.into()),
            (Err(fetch_err), Err(close_err)) => {
                warn!(
                    address = %device.address(),
                    error = %close_err,
                    "Session close also failed after backup error"
                );
                return Err(fetch_err.into());
            }
        };

        let saved = self.store.save(device.address(), &text, Utc::now()).await?;
        Ok(saved)
    }

    async fn fetch_config(&self, session: &mut dyn DeviceSession) -> Result<String, DeviceError> {
        if self.settings.enable_privileged {
            bounded("enable", self.settings.command_timeout, session.enable()).await?;
        }
        bounded(
            "command",
            self.settings.command_timeout,
            session.run_command(&self.settings.backup_command),
        )
        .await
    }
}

fn panic_detail(panic: &(dyn std::any::Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

/// Run one session stage under a timeout
async fn bounded<T, F>(stage: &'static str, after: Duration, fut: F) -> Result<T, DeviceError>
where
    F: Future<Output = Result<T, DeviceError>>,
{
    tokio::time::timeout(after, fut)
        .await
        .map_err(|_| DeviceError::Timeout { stage, after })?
}

fn failure_detail(error: &Error) -> String {
    match error {
        Error::Device(e) => e.to_string(),
        Error::Persistence(e) => e.to_string(),
        other => other.to_string(),
    }
}

//! Backup service: the entry point embedding applications hold
//!
//! [`BackupService`] wires validation, execution, batching, scheduling and
//! status reporting together and exposes the operator-facing operations
//! (manual backup, batch upload, schedule management, status).

use crate::artifacts::ArtifactStore;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::executor::BackupExecutor;
use crate::runner::BatchRunner;
use crate::schedule::{CancelOutcome, ScheduleController, ScheduleStatus, ScheduledJob};
use crate::session::SessionConnector;
use crate::status::{StatusReport, StatusReporter};
use crate::types::{BackupOutcome, BatchOrigin, BatchReport, Event, RawRecord};
use crate::validation::{BatchFormat, BatchValidator, decode_batch};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{Semaphore, broadcast};

/// How long shutdown waits for open device sessions to finish
const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

/// Event channel capacity
const EVENT_CAPACITY: usize = 1000;

/// Network configuration backup service
///
/// # Example
///
/// ```no_run
/// # use std::sync::Arc;
/// # use netbackup::{BackupService, Config};
/// # use netbackup::session::SessionConnector;
/// # async fn example(connector: Arc<dyn SessionConnector>) -> netbackup::Result<()> {
/// let service = BackupService::new(Config::default(), connector)?;
///
/// let record = [("ip", "10.0.0.1"), ("username", "admin"), ("password", "secret")]
///     .into_iter()
///     .map(|(k, v)| (k.to_string(), v.to_string()))
///     .collect();
/// let outcome = service.backup_device(&record).await?;
/// println!("{}", outcome.message());
///
/// service.schedule(2, 30, &[record]).await?;
/// # Ok(())
/// # }
/// ```
pub struct BackupService {
    /// Configuration the service was built with
    pub config: Arc<Config>,
    validator: BatchValidator,
    runner: Arc<BatchRunner>,
    scheduler: ScheduleController,
    reporter: StatusReporter,
    session_limit: Arc<Semaphore>,
    event_tx: broadcast::Sender<Event>,
    accepting_new: AtomicBool,
}

impl BackupService {
    /// Build a service driving devices through `connector`
    ///
    /// Fails if the configuration does not validate. Must be called inside
    /// a tokio runtime.
    pub fn new(config: Config, connector: Arc<dyn SessionConnector>) -> Result<Self> {
        config.validate()?;

        let (event_tx, _rx) = broadcast::channel(EVENT_CAPACITY);
        let store = ArtifactStore::new(&config.storage.backup_dir);
        let session_limit = Arc::new(Semaphore::new(config.session.max_concurrent_sessions));

        let executor = Arc::new(BackupExecutor::new(
            connector,
            store.clone(),
            config.session.clone(),
            session_limit.clone(),
            event_tx.clone(),
        ));
        let runner = Arc::new(BatchRunner::new(
            executor,
            config.batch_concurrency,
            config.retry.clone(),
            event_tx.clone(),
        ));
        let scheduler = ScheduleController::new(runner.clone(), event_tx.clone());
        let reporter = StatusReporter::new(
            store,
            config.storage.log_path(),
            config.status_log_lines,
        );

        Ok(Self {
            validator: BatchValidator::new(config.session.default_device_kind.clone()),
            config: Arc::new(config),
            runner,
            scheduler,
            reporter,
            session_limit,
            event_tx,
            accepting_new: AtomicBool::new(true),
        })
    }

    /// Subscribe to backup and schedule events
    ///
    /// Slow subscribers miss events rather than block backups.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Validate one record and back it up now
    ///
    /// An invalid record is rejected without contacting any device. A
    /// device failure is not an error: it comes back as a failed outcome.
    pub async fn backup_device(&self, record: &RawRecord) -> Result<BackupOutcome> {
        self.ensure_accepting()?;
        let device = self.validator.validate_single(record)?;
        Ok(self.runner.run_device(&device).await)
    }

    /// Validate a batch of records and back them all up
    ///
    /// Validation is all-or-nothing: one bad record rejects the batch
    /// before any device is contacted.
    pub async fn backup_batch(&self, records: &[RawRecord], origin: BatchOrigin) -> Result<BatchReport> {
        self.ensure_accepting()?;
        let devices = self.validator.validate(records)?;
        Ok(self.runner.run_batch(origin, &devices).await)
    }

    /// Decode an uploaded device list and back it up
    pub async fn backup_upload(&self, content: &str, format: BatchFormat) -> Result<BatchReport> {
        let records = decode_batch(content, format)?;
        self.backup_batch(&records, BatchOrigin::Upload).await
    }

    /// Install the daily schedule for the given device records
    ///
    /// Replaces any existing schedule. Invalid input leaves the current
    /// schedule untouched.
    pub async fn schedule(&self, hour: u32, minute: u32, records: &[RawRecord]) -> Result<ScheduledJob> {
        self.ensure_accepting()?;
        let devices = self.validator.validate(records)?;
        Ok(self.scheduler.set(hour, minute, devices).await?)
    }

    /// Cancel the daily schedule
    pub async fn cancel_schedule(&self) -> CancelOutcome {
        self.scheduler.cancel().await
    }

    /// Current schedule
    pub async fn schedule_status(&self) -> ScheduleStatus {
        self.scheduler.status().await
    }

    /// Stored artifacts and the recent operation log
    pub async fn status(&self) -> Result<StatusReport> {
        self.reporter.report().await
    }

    /// Whether the service still accepts new work
    pub fn is_accepting(&self) -> bool {
        self.accepting_new.load(Ordering::SeqCst)
    }

    /// Stop accepting work, drop the schedule and let open sessions finish
    ///
    /// Waits up to 30 seconds for open device sessions to close.
    pub async fn shutdown(&self) -> Result<()> {
        tracing::info!("Initiating graceful shutdown");

        self.accepting_new.store(false, Ordering::SeqCst);
        tracing::info!("Stopped accepting new backups");

        self.scheduler.shutdown().await;

        match tokio::time::timeout(SHUTDOWN_GRACE, self.wait_for_open_sessions()).await {
            Ok(()) => tracing::info!("All device sessions closed"),
            Err(_) => tracing::warn!("Timeout waiting for device sessions, proceeding with shutdown"),
        }

        let _ = self.event_tx.send(Event::Shutdown);
        tracing::info!("Graceful shutdown complete");
        Ok(())
    }

    fn ensure_accepting(&self) -> Result<()> {
        if self.is_accepting() {
            Ok(())
        } else {
            Err(Error::ShuttingDown)
        }
    }

    async fn wait_for_open_sessions(&self) {
        let capacity = self.config.session.max_concurrent_sessions;
        loop {
            let open = capacity - self.session_limit.available_permits().min(capacity);
            if open == 0 {
                return;
            }
            tracing::debug!(open, "Waiting for device sessions to close");
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }
}

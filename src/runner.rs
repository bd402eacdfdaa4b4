//! Batch execution
//!
//! A batch backs up each device independently: one device failing never
//! stops the others. Devices run with bounded parallelism and outcomes are
//! returned in input order regardless of completion order.

use crate::config::RetryConfig;
use crate::executor::BackupExecutor;
use crate::retry::with_retry;
use crate::types::{BackupOutcome, BatchOrigin, BatchReport, DeviceDescriptor, Event};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::info;

/// Runs batches of device backups
pub struct BatchRunner {
    executor: Arc<BackupExecutor>,
    concurrency: usize,
    retry: RetryConfig,
    event_tx: broadcast::Sender<Event>,
}

impl BatchRunner {
    /// Create a runner backing up at most `concurrency` devices at once
    pub fn new(
        executor: Arc<BackupExecutor>,
        concurrency: usize,
        retry: RetryConfig,
        event_tx: broadcast::Sender<Event>,
    ) -> Self {
        Self {
            executor,
            concurrency: concurrency.max(1),
            retry,
            event_tx,
        }
    }

    /// Back up every device, returning one outcome per device in input order
    pub async fn run(&self, devices: &[DeviceDescriptor]) -> Vec<BackupOutcome> {
        // Must stay `Send`: scheduled batches run on spawned tasks
        let pending: Vec<_> = devices.iter().map(|d| self.run_device(d)).collect();
        stream::iter(pending)
            .buffered(self.concurrency)
            .collect()
            .await
    }

    /// Run a batch and summarize it
    ///
    /// Logs the totals and emits [`Event::BatchCompleted`].
    pub async fn run_batch(&self, origin: BatchOrigin, devices: &[DeviceDescriptor]) -> BatchReport {
        info!(origin = %origin, devices = devices.len(), "Starting backup batch");

        let report = BatchReport::new(origin, self.run(devices).await);

        info!(
            origin = %origin,
            succeeded = report.succeeded,
            failed = report.failed,
            "Backup batch finished"
        );
        let _ = self.event_tx.send(Event::BatchCompleted {
            origin,
            succeeded: report.succeeded,
            failed: report.failed,
        });
        report
    }

    /// Back up one device under the configured retry policy
    pub async fn run_device(&self, device: &DeviceDescriptor) -> BackupOutcome {
        if self.retry.max_attempts == 0 {
            return self.executor.execute(device).await;
        }
        let result = with_retry(&self.retry, || self.executor.attempt(device)).await;
        self.executor.record(device, result)
    }
}

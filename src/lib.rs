//! # netbackup
//!
//! Backup engine for network device configurations.
//!
//! Operators submit devices one at a time, upload a device list (CSV, YAML
//! or JSON), or install a daily schedule. Each device is logged into through
//! a pluggable [`SessionConnector`](session::SessionConnector), its running
//! configuration is read and written verbatim to a timestamped `.cfg` file,
//! and every attempt leaves one line in the operation log.
//!
//! ## Design
//!
//! - **Transport-agnostic** - The engine drives sessions; SSH/Telnet live behind a trait
//! - **Failure-isolating** - One device failing never stops a batch
//! - **Single schedule slot** - Setting a schedule replaces the previous one
//! - **Event-driven** - Consumers subscribe to events instead of polling
//!
//! ## Quick Start
//!
//! ```no_run
//! use netbackup::{BackupService, Config};
//! use netbackup::session::SessionConnector;
//! use std::sync::Arc;
//!
//! # async fn example(connector: Arc<dyn SessionConnector>) -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::from_env()?;
//! let _log_guard = netbackup::logging::init(&config.storage, true)?;
//!
//! let service = BackupService::new(config, connector)?;
//!
//! let mut events = service.subscribe();
//! tokio::spawn(async move {
//!     while let Ok(event) = events.recv().await {
//!         println!("Event: {:?}", event);
//!     }
//! });
//!
//! let csv = "ip,username,password\n10.0.0.1,admin,secret\n";
//! let report = service
//!     .backup_upload(csv, netbackup::validation::BatchFormat::Csv)
//!     .await?;
//! println!("{} saved, {} failed", report.succeeded, report.failed);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// REST API module
pub mod api;
/// Artifact store for saved configurations
pub mod artifacts;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Single-device backup execution
pub mod executor;
/// Operation log setup
pub mod logging;
/// Retry logic with exponential backoff
pub mod retry;
/// Batch execution
pub mod runner;
/// Daily recurring schedule
pub mod schedule;
/// Service facade wiring everything together
pub mod service;
/// Device session capability traits
pub mod session;
/// Status reporting
pub mod status;
/// Core types and events
pub mod types;
/// Device record validation and upload decoding
pub mod validation;

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;

// Re-export commonly used types
pub use config::{Config, RetryConfig, SessionConfig, StorageConfig};
pub use error::{
    ApiError, DeviceError, Error, ErrorDetail, PersistenceError, Result, ScheduleError,
    ToHttpStatus, ValidationError,
};
pub use schedule::{CancelOutcome, ScheduleStatus, ScheduledJob};
pub use service::BackupService;
pub use session::{DeviceSession, SessionConnector};
pub use types::{BackupOutcome, BatchOrigin, BatchReport, DeviceDescriptor, Event, RawRecord};
pub use validation::{BatchFormat, BatchValidator};

/// Helper function to run the service with graceful signal handling.
///
/// Waits for a termination signal and then calls the service's `shutdown()` method.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use netbackup::{BackupService, Config, run_with_shutdown};
/// use netbackup::session::SessionConnector;
/// use std::sync::Arc;
///
/// # async fn example(connector: Arc<dyn SessionConnector>) -> Result<(), Box<dyn std::error::Error>> {
/// let service = Arc::new(BackupService::new(Config::default(), connector)?);
///
/// tokio::spawn(netbackup::api::start_api_server(service.clone(), service.config.clone()));
/// run_with_shutdown(service).await?;
/// # Ok(())
/// # }
/// ```
pub async fn run_with_shutdown(service: std::sync::Arc<BackupService>) -> Result<()> {
    wait_for_signal().await;
    service.shutdown().await
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Registration can fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}

//! Operation log setup
//!
//! Every backup attempt produces one line in `{log_dir}/{log_file_name}`:
//! timestamp, level, message and structured fields, no colors. The status
//! report reads the tail of the same file.

use crate::config::StorageConfig;
use crate::error::{Error, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Default filter when `RUST_LOG` is unset
const DEFAULT_FILTER: &str = "info";

/// Install the global subscriber writing to the operation log
///
/// With `console` set, lines are mirrored to stderr. Keep the returned
/// guard alive for the life of the process; dropping it flushes the file.
pub fn init(storage: &StorageConfig, console: bool) -> Result<WorkerGuard> {
    let (subscriber, guard) = file_subscriber(storage, console)?;
    subscriber
        .try_init()
        .map_err(|e| Error::Other(format!("Failed to init logging: {e}")))?;

    tracing::info!(log_file = %storage.log_path().display(), "Logging initialized");
    Ok(guard)
}

/// Build the subscriber without installing it
pub fn file_subscriber(
    storage: &StorageConfig,
    console: bool,
) -> Result<(impl tracing::Subscriber + Send + Sync + 'static, WorkerGuard)> {
    std::fs::create_dir_all(&storage.log_dir)?;

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(&storage.log_file_name)
        .build(&storage.log_dir)
        .map_err(|e| Error::Config {
            message: format!("cannot open log file: {e}"),
            key: Some("log_dir".into()),
        })?;
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(false),
        )
        .with(console.then(|| fmt::layer().with_writer(std::io::stderr)));

    Ok((subscriber, guard))
}

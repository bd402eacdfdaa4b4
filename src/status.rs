//! Status report: stored artifacts and the tail of the operation log

use crate::artifacts::{ArtifactEntry, ArtifactStore};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::io::{ErrorKind, SeekFrom};
use std::path::PathBuf;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use utoipa::ToSchema;

/// Initial size of the log tail read; doubled until enough lines are found
const TAIL_WINDOW_BYTES: u64 = 256 * 1024;

/// Stored artifacts plus recent log lines
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct StatusReport {
    /// Artifacts, newest first
    pub artifacts: Vec<ArtifactEntry>,
    /// Last lines of the operation log, oldest first
    pub recent_log: Vec<String>,
}

/// Builds [`StatusReport`]s
#[derive(Clone, Debug)]
pub struct StatusReporter {
    store: ArtifactStore,
    log_path: PathBuf,
    log_lines: usize,
}

impl StatusReporter {
    /// Reporter over `store` and the log at `log_path`, showing `log_lines` lines
    pub fn new(store: ArtifactStore, log_path: impl Into<PathBuf>, log_lines: usize) -> Self {
        Self {
            store,
            log_path: log_path.into(),
            log_lines,
        }
    }

    /// Current artifacts and log tail
    pub async fn report(&self) -> Result<StatusReport> {
        Ok(StatusReport {
            artifacts: self.store.list().await?,
            recent_log: self.recent_log().await?,
        })
    }

    /// Last configured number of log lines, verbatim
    ///
    /// A missing log file has no lines.
    pub async fn recent_log(&self) -> Result<Vec<String>> {
        if self.log_lines == 0 {
            return Ok(Vec::new());
        }

        let mut file = match tokio::fs::File::open(&self.log_path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let len = file.metadata().await?.len();
        let mut window = TAIL_WINDOW_BYTES;
        loop {
            let start = len.saturating_sub(window);
            file.seek(SeekFrom::Start(start)).await?;

            let mut bytes = Vec::new();
            file.read_to_end(&mut bytes).await?;
            let text = String::from_utf8_lossy(&bytes);

            let mut lines: Vec<&str> = text.lines().collect();
            if start > 0 && !lines.is_empty() {
                // First line of the window is probably cut in half
                lines.remove(0);
            }

            if start == 0 || lines.len() >= self.log_lines {
                let skip = lines.len().saturating_sub(self.log_lines);
                return Ok(lines[skip..].iter().map(|l| l.to_string()).collect());
            }
            window = window.saturating_mul(2);
        }
    }
}

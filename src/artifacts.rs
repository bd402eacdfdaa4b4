//! Artifact store: one `.cfg` file per successful backup
//!
//! Files are named `{address}_{YYYYmmdd_HHMMSS}.cfg` from the UTC time of the
//! backup and hold the retrieved configuration byte-for-byte. Existing files
//! are never overwritten; a second backup of the same device within the same
//! second gets a numeric suffix.

use crate::error::PersistenceError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use utoipa::ToSchema;

const ARTIFACT_EXTENSION: &str = "cfg";
const MAX_NAME_COLLISIONS: u32 = 1000;

/// A freshly written artifact
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SavedArtifact {
    /// File name inside the backup directory
    pub filename: String,
    /// Full path of the file
    pub path: PathBuf,
}

/// An artifact found in the backup directory
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ArtifactEntry {
    /// File name inside the backup directory
    pub filename: String,
    /// File size in bytes
    pub size_bytes: u64,
    /// Last modification time, if the platform reports it
    #[schema(value_type = Option<String>)]
    pub modified: Option<DateTime<Utc>>,
}

/// Directory of backup artifacts
#[derive(Clone, Debug)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    /// Create a store rooted at `dir` (created lazily on first save)
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the artifacts
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Base file name for a backup of `address` taken at `at`
    ///
    /// Characters outside `[A-Za-z0-9._-]` (IPv6 colons, path separators)
    /// are replaced with `-`.
    pub fn artifact_name(address: &str, at: DateTime<Utc>) -> String {
        format!(
            "{}_{}.{ARTIFACT_EXTENSION}",
            sanitize_address(address),
            at.format("%Y%m%d_%H%M%S")
        )
    }

    /// Write `contents` verbatim to a new artifact file
    ///
    /// Fails if the directory cannot be created or written. A partially
    /// written file is removed before the error is returned.
    pub async fn save(
        &self,
        address: &str,
        contents: &str,
        at: DateTime<Utc>,
    ) -> Result<SavedArtifact, PersistenceError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| PersistenceError::CreateDir {
                path: self.dir.clone(),
                reason: e.to_string(),
            })?;

        let base = Self::artifact_name(address, at);
        let stem = base.trim_end_matches(&format!(".{ARTIFACT_EXTENSION}")).to_string();

        for attempt in 0..MAX_NAME_COLLISIONS {
            let filename = if attempt == 0 {
                base.clone()
            } else {
                format!("{stem}_{attempt}.{ARTIFACT_EXTENSION}")
            };
            let path = self.dir.join(&filename);

            let mut file = match tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => file,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => {
                    return Err(PersistenceError::Write {
                        path,
                        reason: e.to_string(),
                    });
                }
            };

            let written = async {
                file.write_all(contents.as_bytes()).await?;
                file.flush().await?;
                file.sync_all().await
            }
            .await;

            if let Err(e) = written {
                drop(file);
                if let Err(cleanup) = tokio::fs::remove_file(&path).await {
                    tracing::warn!(path = %path.display(), error = %cleanup, "Failed to remove partial artifact");
                }
                return Err(PersistenceError::Write {
                    path,
                    reason: e.to_string(),
                });
            }

            return Ok(SavedArtifact { filename, path });
        }

        Err(PersistenceError::Write {
            path: self.dir.join(base),
            reason: format!("{MAX_NAME_COLLISIONS} artifacts already exist for this second"),
        })
    }

    /// List artifacts newest first (by modification time, then name)
    ///
    /// A missing backup directory simply has no artifacts.
    pub async fn list(&self) -> std::io::Result<Vec<ArtifactEntry>> {
        let mut dir = match tokio::fs::read_dir(&self.dir).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut entries = Vec::new();
        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(ARTIFACT_EXTENSION) {
                continue;
            }
            let metadata = entry.metadata().await?;
            if !metadata.is_file() {
                continue;
            }
            entries.push(ArtifactEntry {
                filename: entry.file_name().to_string_lossy().into_owned(),
                size_bytes: metadata.len(),
                modified: metadata.modified().ok().map(DateTime::<Utc>::from),
            });
        }

        entries.sort_by(|a, b| {
            b.modified
                .cmp(&a.modified)
                .then_with(|| b.filename.cmp(&a.filename))
        });
        Ok(entries)
    }
}

fn sanitize_address(address: &str) -> String {
    address
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '-'
            }
        })
        .collect()
}

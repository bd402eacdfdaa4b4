//! Application state for the API server

use crate::{BackupService, Config};
use std::sync::Arc;

/// Shared application state accessible to all route handlers
///
/// Cloned for each request (cheap Arc clone).
#[derive(Clone)]
pub struct AppState {
    /// The backup service handling every operation
    pub service: Arc<BackupService>,

    /// Configuration (read-only)
    pub config: Arc<Config>,
}

impl AppState {
    /// Create a new AppState
    pub fn new(service: Arc<BackupService>, config: Arc<Config>) -> Self {
        Self { service, config }
    }
}

//! Configuration types for netbackup

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::PathBuf, time::Duration};

/// Where artifacts and the operation log live
///
/// Used as a flattened sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory receiving `{address}_{timestamp}.cfg` artifacts (default: "./backups")
    #[serde(default = "default_backup_dir")]
    pub backup_dir: PathBuf,

    /// Directory holding the operation log (default: "./logs")
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,

    /// File name of the operation log inside `log_dir` (default: "backup.log")
    #[serde(default = "default_log_file_name")]
    pub log_file_name: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backup_dir: default_backup_dir(),
            log_dir: default_log_dir(),
            log_file_name: default_log_file_name(),
        }
    }
}

impl StorageConfig {
    /// Full path of the operation log
    pub fn log_path(&self) -> PathBuf {
        self.log_dir.join(&self.log_file_name)
    }
}

/// How device sessions are driven
///
/// Used as a flattened sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Platform tag used when a record carries no `device_type` (default: "cisco_ios")
    #[serde(default = "default_device_kind")]
    pub default_device_kind: String,

    /// Read-only command that returns the full running configuration
    /// (default: "show running-config")
    #[serde(default = "default_backup_command")]
    pub backup_command: String,

    /// Enter privileged mode before running the backup command (default: true)
    #[serde(default = "default_true")]
    pub enable_privileged: bool,

    /// Bound on opening and closing a session (default: 30 seconds)
    #[serde(default = "default_connect_timeout", with = "duration_serde")]
    pub connect_timeout: Duration,

    /// Bound on privileged-mode entry and on the backup command (default: 60 seconds)
    #[serde(default = "default_command_timeout", with = "duration_serde")]
    pub command_timeout: Duration,

    /// Process-wide cap on simultaneously open device sessions (default: 16)
    #[serde(default = "default_max_concurrent_sessions")]
    pub max_concurrent_sessions: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_device_kind: default_device_kind(),
            backup_command: default_backup_command(),
            enable_privileged: true,
            connect_timeout: default_connect_timeout(),
            command_timeout: default_command_timeout(),
            max_concurrent_sessions: default_max_concurrent_sessions(),
        }
    }
}

/// Main configuration for [`BackupService`](crate::BackupService)
///
/// Sub-configs are flattened, so the serialized form has no nesting apart
/// from `retry` and `api`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Artifact and log locations
    #[serde(flatten)]
    pub storage: StorageConfig,

    /// Device session behavior
    #[serde(flatten)]
    pub session: SessionConfig,

    /// Devices backed up in parallel within one batch (default: 4)
    #[serde(default = "default_batch_concurrency")]
    pub batch_concurrency: usize,

    /// Number of log lines surfaced by the status report (default: 50)
    #[serde(default = "default_status_log_lines")]
    pub status_log_lines: usize,

    /// Explicit retry policy wrapped around each device attempt
    #[serde(default)]
    pub retry: RetryConfig,

    /// REST API settings
    #[serde(default)]
    pub api: ApiConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage: StorageConfig::default(),
            session: SessionConfig::default(),
            batch_concurrency: default_batch_concurrency(),
            status_log_lines: default_status_log_lines(),
            retry: RetryConfig::default(),
            api: ApiConfig::default(),
        }
    }
}

impl Config {
    /// Build a config from defaults, a `.env` file (if present) and the
    /// process environment.
    ///
    /// Recognized variables: `BACKUP_DIR`, `LOG_DIR`, `NETBACKUP_BIND_ADDRESS`.
    pub fn from_env() -> Result<Self> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                tracing::warn!(error = %e, "Ignoring unreadable .env file");
            }
        }

        let mut config = Self::default();
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides using the given lookup
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup("BACKUP_DIR").filter(|v| !v.is_empty()) {
            self.storage.backup_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup("LOG_DIR").filter(|v| !v.is_empty()) {
            self.storage.log_dir = PathBuf::from(dir);
        }
        if let Some(addr) = lookup("NETBACKUP_BIND_ADDRESS").filter(|v| !v.is_empty()) {
            self.api.bind_address = addr.parse().map_err(|e| Error::Config {
                message: format!("invalid bind address '{addr}': {e}"),
                key: Some("api.bind_address".into()),
            })?;
        }
        Ok(())
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        fn invalid(key: &str, message: &str) -> Error {
            Error::Config {
                message: message.to_string(),
                key: Some(key.to_string()),
            }
        }

        if self.batch_concurrency == 0 {
            return Err(invalid("batch_concurrency", "must be at least 1"));
        }
        if self.session.max_concurrent_sessions == 0 {
            return Err(invalid("max_concurrent_sessions", "must be at least 1"));
        }
        if self.session.connect_timeout.is_zero() {
            return Err(invalid("connect_timeout", "must be greater than zero"));
        }
        if self.session.command_timeout.is_zero() {
            return Err(invalid("command_timeout", "must be greater than zero"));
        }
        if self.session.backup_command.trim().is_empty() {
            return Err(invalid("backup_command", "must not be empty"));
        }
        if self.session.default_device_kind.trim().is_empty() {
            return Err(invalid("default_device_kind", "must not be empty"));
        }
        if self.storage.log_file_name.trim().is_empty() {
            return Err(invalid("log_file_name", "must not be empty"));
        }
        if self.retry.backoff_multiplier < 1.0 {
            return Err(invalid("retry.backoff_multiplier", "must be at least 1.0"));
        }
        Ok(())
    }
}

/// Retry configuration for transient device failures
///
/// Off by default: every device gets exactly one attempt unless
/// `max_attempts` is raised. Repeated reconnects against unreachable gear
/// put load on the device side, so keep the cap small.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retry attempts after the first one (default: 0)
    #[serde(default)]
    pub max_attempts: u32,

    /// Initial delay before first retry (default: 5 seconds)
    #[serde(default = "default_initial_delay", with = "duration_serde")]
    pub initial_delay: Duration,

    /// Maximum delay between retries (default: 60 seconds)
    #[serde(default = "default_max_delay", with = "duration_serde")]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: true)
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 0,
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: true,
        }
    }
}

/// REST API configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Address to bind to (default: 127.0.0.1:5000)
    #[serde(default = "default_bind_address")]
    pub bind_address: SocketAddr,

    /// Enable CORS for browser access (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins (default: ["*"])
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Enable Swagger UI at /swagger-ui (default: true)
    #[serde(default = "default_true")]
    pub swagger_ui: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            cors_enabled: true,
            cors_origins: default_cors_origins(),
            swagger_ui: true,
        }
    }
}

fn default_backup_dir() -> PathBuf {
    PathBuf::from("./backups")
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("./logs")
}

fn default_log_file_name() -> String {
    "backup.log".to_string()
}

fn default_device_kind() -> String {
    "cisco_ios".to_string()
}

fn default_backup_command() -> String {
    "show running-config".to_string()
}

fn default_true() -> bool {
    true
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_command_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_max_concurrent_sessions() -> usize {
    16
}

fn default_batch_concurrency() -> usize {
    4
}

fn default_status_log_lines() -> usize {
    50
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(5)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(60)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 5000))
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

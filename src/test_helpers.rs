//! Shared test helpers: a scripted session connector and service builders.

use crate::config::Config;
use crate::error::DeviceError;
use crate::service::BackupService;
use crate::session::{DeviceSession, SessionConnector};
use crate::types::DeviceDescriptor;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::{TempDir, tempdir};

/// Password used by every test descriptor; assertions search output for it
pub(crate) const PASSWORD: &str = "s3cr3t-test-pw";

/// What a fake device does when driven
#[derive(Clone, Debug)]
pub(crate) enum Script {
    /// Return this configuration text
    Config(String),
    /// Return the text after a delay
    Slow(Duration, String),
    /// Fail to open
    RefuseOpen(DeviceError),
    /// Fail privileged-mode entry
    FailEnable(DeviceError),
    /// Fail the backup command
    FailCommand(DeviceError),
    /// Return config, then fail on close
    FailClose(DeviceError),
    /// Never answer the backup command
    HangCommand,
    /// Panic inside the backup command
    Panic,
}

#[derive(Default)]
struct FakeState {
    scripts: Mutex<HashMap<String, Script>>,
    opened: AtomicUsize,
    closed: AtomicUsize,
    enabled: AtomicUsize,
    live: AtomicUsize,
    peak_live: AtomicUsize,
    commands: Mutex<Vec<String>>,
    open_order: Mutex<Vec<String>>,
}

/// Connector whose devices follow a [`Script`] keyed by address
#[derive(Clone)]
pub(crate) struct FakeConnector {
    default: Script,
    state: Arc<FakeState>,
}

impl FakeConnector {
    pub(crate) fn new(default: Script) -> Self {
        Self {
            default,
            state: Arc::new(FakeState::default()),
        }
    }

    /// Give one address its own behavior
    pub(crate) fn with_script(self, address: &str, script: Script) -> Self {
        self.state
            .scripts
            .lock()
            .unwrap()
            .insert(address.to_string(), script);
        self
    }

    pub(crate) fn opened(&self) -> usize {
        self.state.opened.load(Ordering::SeqCst)
    }

    pub(crate) fn closed(&self) -> usize {
        self.state.closed.load(Ordering::SeqCst)
    }

    pub(crate) fn enabled(&self) -> usize {
        self.state.enabled.load(Ordering::SeqCst)
    }

    pub(crate) fn peak_live(&self) -> usize {
        self.state.peak_live.load(Ordering::SeqCst)
    }

    pub(crate) fn commands(&self) -> Vec<String> {
        self.state.commands.lock().unwrap().clone()
    }

    pub(crate) fn open_order(&self) -> Vec<String> {
        self.state.open_order.lock().unwrap().clone()
    }

    fn script_for(&self, address: &str) -> Script {
        self.state
            .scripts
            .lock()
            .unwrap()
            .get(address)
            .cloned()
            .unwrap_or_else(|| self.default.clone())
    }
}

#[async_trait]
impl SessionConnector for FakeConnector {
    async fn open(&self, device: &DeviceDescriptor) -> Result<Box<dyn DeviceSession>, DeviceError> {
        assert_eq!(device.password(), PASSWORD, "descriptor carries the password");
        self.state.opened.fetch_add(1, Ordering::SeqCst);
        self.state
            .open_order
            .lock()
            .unwrap()
            .push(device.address().to_string());

        let script = self.script_for(device.address());
        if let Script::RefuseOpen(e) = script {
            return Err(e);
        }

        let live = self.state.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.peak_live.fetch_max(live, Ordering::SeqCst);

        Ok(Box::new(FakeSession {
            script,
            state: self.state.clone(),
            open: true,
        }))
    }
}

struct FakeSession {
    script: Script,
    state: Arc<FakeState>,
    open: bool,
}

#[async_trait]
impl DeviceSession for FakeSession {
    async fn enable(&mut self) -> Result<(), DeviceError> {
        self.state.enabled.fetch_add(1, Ordering::SeqCst);
        match &self.script {
            Script::FailEnable(e) => Err(e.clone()),
            _ => Ok(()),
        }
    }

    async fn run_command(&mut self, command: &str) -> Result<String, DeviceError> {
        self.state.commands.lock().unwrap().push(command.to_string());
        match &self.script {
            Script::Config(text) => Ok(text.clone()),
            Script::FailClose(_) => Ok("hostname closing\n".to_string()),
            Script::Slow(delay, text) => {
                tokio::time::sleep(*delay).await;
                Ok(text.clone())
            }
            Script::FailCommand(e) => Err(e.clone()),
            Script::HangCommand => std::future::pending().await,
            Script::Panic => panic!("fake device exploded"),
            _ => Ok("hostname fake\n".to_string()),
        }
    }

    async fn close(&mut self) -> Result<(), DeviceError> {
        assert!(self.open, "session closed twice");
        self.open = false;
        self.state.closed.fetch_add(1, Ordering::SeqCst);
        self.state.live.fetch_sub(1, Ordering::SeqCst);
        match &self.script {
            Script::FailClose(e) => Err(e.clone()),
            _ => Ok(()),
        }
    }
}

/// A validated descriptor for `address` with the shared test password
pub(crate) fn descriptor(address: &str) -> DeviceDescriptor {
    DeviceDescriptor::from_parts(
        address.to_string(),
        "admin".to_string(),
        PASSWORD.to_string(),
        "cisco_ios".to_string(),
    )
}

/// A raw record as it would arrive from a form or upload
pub(crate) fn record(address: &str) -> crate::types::RawRecord {
    [
        ("ip", address),
        ("username", "admin"),
        ("password", PASSWORD),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

/// Config rooted in a fresh temp dir with short timeouts
pub(crate) fn test_config(temp: &TempDir) -> Config {
    let mut config = Config::default();
    config.storage.backup_dir = temp.path().join("backups");
    config.storage.log_dir = temp.path().join("logs");
    config.session.connect_timeout = Duration::from_secs(2);
    config.session.command_timeout = Duration::from_secs(2);
    config
}

/// Service wired to `fake`. Returns the temp dir, which must be kept alive.
pub(crate) fn create_test_service(fake: &FakeConnector) -> (BackupService, TempDir) {
    let temp = tempdir().unwrap();
    let service = BackupService::new(test_config(&temp), Arc::new(fake.clone())).unwrap();
    (service, temp)
}

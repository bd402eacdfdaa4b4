//! Scripted in-memory device sessions

use async_trait::async_trait;
use netbackup::{DeviceDescriptor, DeviceError, DeviceSession, SessionConnector};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Where a fake device should fail, if anywhere
#[derive(Clone, Debug)]
pub enum Behavior {
    /// Hand back this configuration
    Respond(String),
    /// `open` fails
    FailOnOpen(DeviceError),
    /// The backup command fails
    FailOnCommand(DeviceError),
    /// Configuration is read, then `close` fails
    FailOnClose(DeviceError),
}

#[derive(Default)]
struct Counters {
    opened: AtomicUsize,
    closed: AtomicUsize,
    passwords_seen: Mutex<Vec<String>>,
}

/// Connector answering per address from a behavior table
#[derive(Clone)]
pub struct ScriptedConnector {
    default: Behavior,
    overrides: Arc<HashMap<String, Behavior>>,
    counters: Arc<Counters>,
}

impl ScriptedConnector {
    pub fn new(default: Behavior) -> Self {
        Self {
            default,
            overrides: Arc::new(HashMap::new()),
            counters: Arc::new(Counters::default()),
        }
    }

    pub fn with(mut self, address: &str, behavior: Behavior) -> Self {
        Arc::make_mut(&mut self.overrides).insert(address.to_string(), behavior);
        self
    }

    pub fn opened(&self) -> usize {
        self.counters.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.counters.closed.load(Ordering::SeqCst)
    }

    pub fn passwords_seen(&self) -> Vec<String> {
        self.counters.passwords_seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl SessionConnector for ScriptedConnector {
    async fn open(&self, device: &DeviceDescriptor) -> Result<Box<dyn DeviceSession>, DeviceError> {
        self.counters.opened.fetch_add(1, Ordering::SeqCst);
        self.counters
            .passwords_seen
            .lock()
            .unwrap()
            .push(device.password().to_string());

        let behavior = self
            .overrides
            .get(device.address())
            .cloned()
            .unwrap_or_else(|| self.default.clone());

        if let Behavior::FailOnOpen(e) = behavior {
            return Err(e);
        }
        Ok(Box::new(ScriptedSession {
            behavior,
            counters: self.counters.clone(),
        }))
    }
}

struct ScriptedSession {
    behavior: Behavior,
    counters: Arc<Counters>,
}

#[async_trait]
impl DeviceSession for ScriptedSession {
    async fn run_command(&mut self, _command: &str) -> Result<String, DeviceError> {
        match &self.behavior {
            Behavior::Respond(text) => Ok(text.clone()),
            Behavior::FailOnCommand(e) => Err(e.clone()),
            Behavior::FailOnClose(_) => Ok("hostname partial\n".to_string()),
            Behavior::FailOnOpen(e) => Err(e.clone()),
        }
    }

    async fn close(&mut self) -> Result<(), DeviceError> {
        self.counters.closed.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            Behavior::FailOnClose(e) => Err(e.clone()),
            _ => Ok(()),
        }
    }
}

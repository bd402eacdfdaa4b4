//! Device session capability
//!
//! The backup engine never speaks a device protocol itself. Embedding
//! applications supply a [`SessionConnector`] (SSH, Telnet, a vendor API,
//! or a fake in tests) and the engine drives it through a fixed sequence:
//! open, optionally enable, run the backup command, close.
//!
//! # Example
//!
//! ```no_run
//! use async_trait::async_trait;
//! use netbackup::error::DeviceError;
//! use netbackup::session::{DeviceSession, SessionConnector};
//! use netbackup::types::DeviceDescriptor;
//!
//! struct EchoConnector;
//! struct EchoSession;
//!
//! #[async_trait]
//! impl SessionConnector for EchoConnector {
//!     async fn open(
//!         &self,
//!         device: &DeviceDescriptor,
//!     ) -> Result<Box<dyn DeviceSession>, DeviceError> {
//!         if device.device_kind() != "cisco_ios" {
//!             return Err(DeviceError::Connect("unsupported platform".into()));
//!         }
//!         Ok(Box::new(EchoSession))
//!     }
//! }
//!
//! #[async_trait]
//! impl DeviceSession for EchoSession {
//!     async fn run_command(&mut self, command: &str) -> Result<String, DeviceError> {
//!         Ok(format!("! output of {command}\n"))
//!     }
//!
//!     async fn close(&mut self) -> Result<(), DeviceError> {
//!         Ok(())
//!     }
//! }
//! ```

use crate::error::DeviceError;
use crate::types::DeviceDescriptor;
use async_trait::async_trait;

/// Opens sessions to devices
///
/// Implementations receive the full descriptor, including the password.
/// They must not log it.
#[async_trait]
pub trait SessionConnector: Send + Sync {
    /// Connect and authenticate to `device`
    async fn open(&self, device: &DeviceDescriptor) -> Result<Box<dyn DeviceSession>, DeviceError>;
}

/// One open, authenticated session to a device
///
/// The engine calls [`close`](DeviceSession::close) exactly once on every
/// session it opened, including after a failed command.
#[async_trait]
pub trait DeviceSession: Send {
    /// Enter privileged mode
    ///
    /// Platforms without a privilege step can keep the default no-op.
    async fn enable(&mut self) -> Result<(), DeviceError> {
        Ok(())
    }

    /// Run a read-only command and return its full text output
    async fn run_command(&mut self, command: &str) -> Result<String, DeviceError>;

    /// Disconnect
    async fn close(&mut self) -> Result<(), DeviceError>;
}

//! Batch validation: raw records in, device descriptors out
//!
//! Validation is all-or-nothing. The first record that is missing a required
//! field rejects the whole batch, so callers are never handed a partial
//! device list and cannot silently skip bad rows.
//!
//! # Example
//!
//! ```rust
//! use netbackup::validation::BatchValidator;
//! use netbackup::types::RawRecord;
//!
//! let record: RawRecord = [
//!     ("ip".to_string(), "10.0.0.1".to_string()),
//!     ("username".to_string(), "admin".to_string()),
//!     ("password".to_string(), "secret".to_string()),
//! ]
//! .into_iter()
//! .collect();
//!
//! let validator = BatchValidator::new("cisco_ios");
//! let devices = validator.validate(&[record]).unwrap();
//! assert_eq!(devices[0].address(), "10.0.0.1");
//! assert_eq!(devices[0].device_kind(), "cisco_ios");
//! ```

mod decode;

pub use decode::{BatchFormat, decode_batch};

use crate::error::ValidationError;
use crate::types::{DeviceDescriptor, RawRecord};

const ADDRESS_KEYS: &[&str] = &["address", "ip"];
const USERNAME_KEYS: &[&str] = &["username"];
const PASSWORD_KEYS: &[&str] = &["password"];
const KIND_KEYS: &[&str] = &["device_type", "device_kind"];

/// Turns raw records into validated [`DeviceDescriptor`]s
#[derive(Clone, Debug)]
pub struct BatchValidator {
    default_device_kind: String,
}

impl BatchValidator {
    /// Create a validator that fills absent device kinds with `default_device_kind`
    pub fn new(default_device_kind: impl Into<String>) -> Self {
        Self {
            default_device_kind: default_device_kind.into(),
        }
    }

    /// Validate a whole batch, preserving input order
    ///
    /// Fails on an empty batch or on the first record missing `address`
    /// (or `ip`), `username` or `password`.
    pub fn validate(&self, records: &[RawRecord]) -> Result<Vec<DeviceDescriptor>, ValidationError> {
        if records.is_empty() {
            return Err(ValidationError::EmptyBatch);
        }

        records
            .iter()
            .enumerate()
            .map(|(idx, record)| self.validate_record(idx + 1, record))
            .collect()
    }

    /// Validate one record submitted on its own (the manual path)
    pub fn validate_single(&self, record: &RawRecord) -> Result<DeviceDescriptor, ValidationError> {
        self.validate_record(1, record)
    }

    fn validate_record(
        &self,
        position: usize,
        record: &RawRecord,
    ) -> Result<DeviceDescriptor, ValidationError> {
        let missing = |field: &'static str| ValidationError::MissingField {
            record: position,
            field,
        };

        let address = lookup(record, ADDRESS_KEYS).ok_or_else(|| missing("address"))?;
        let username = lookup(record, USERNAME_KEYS).ok_or_else(|| missing("username"))?;
        let password = lookup_raw(record, PASSWORD_KEYS).ok_or_else(|| missing("password"))?;
        let device_kind = lookup(record, KIND_KEYS).unwrap_or(self.default_device_kind.as_str());

        Ok(DeviceDescriptor::from_parts(
            address.to_string(),
            username.to_string(),
            password.to_string(),
            device_kind.to_string(),
        ))
    }
}

/// First non-blank value under any of `keys`, trimmed
fn lookup<'a>(record: &'a RawRecord, keys: &[&str]) -> Option<&'a str> {
    lookup_raw(record, keys).map(str::trim)
}

/// First non-blank value under any of `keys`, untouched
///
/// Header names are matched case-insensitively and ignoring surrounding
/// whitespace, since spreadsheet exports are inconsistent about both.
fn lookup_raw<'a>(record: &'a RawRecord, keys: &[&str]) -> Option<&'a str> {
    keys.iter().find_map(|wanted| {
        record
            .iter()
            .find(|(key, value)| key.trim().eq_ignore_ascii_case(wanted) && !value.trim().is_empty())
            .map(|(_, value)| value.as_str())
    })
}

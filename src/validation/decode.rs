//! Decoding uploaded device lists into raw records
//!
//! CSV files carry a header row naming the fields. YAML and JSON documents
//! must be a top-level list of mappings; anything else is reported as
//! [`ValidationError::NotASequence`], distinct from per-record field errors.

use crate::error::ValidationError;
use crate::types::RawRecord;
use serde::{Deserialize, Serialize};
use std::path::Path;
use utoipa::ToSchema;

/// Wire format of an uploaded device list
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum BatchFormat {
    /// Comma-separated values with a header row
    Csv,
    /// YAML list of mappings
    Yaml,
    /// JSON array of objects
    Json,
}

impl BatchFormat {
    /// Pick the format from an uploaded file's extension
    ///
    /// Accepts `.csv`, `.yaml`, `.yml` and `.json` (case-insensitive).
    pub fn from_file_name(name: &str) -> Result<Self, ValidationError> {
        let ext = Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);

        match ext.as_deref() {
            Some("csv") => Ok(BatchFormat::Csv),
            Some("yaml") | Some("yml") => Ok(BatchFormat::Yaml),
            Some("json") => Ok(BatchFormat::Json),
            _ => Err(ValidationError::UnsupportedFormat(name.to_string())),
        }
    }
}

/// Decode upload text into raw records in document order
pub fn decode_batch(text: &str, format: BatchFormat) -> Result<Vec<RawRecord>, ValidationError> {
    match format {
        BatchFormat::Csv => decode_csv(text),
        BatchFormat::Yaml => decode_yaml(text),
        BatchFormat::Json => decode_json(text),
    }
}

fn decode_csv(text: &str) -> Result<Vec<RawRecord>, ValidationError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| ValidationError::Decode(e.to_string()))?
        .clone();

    reader
        .records()
        .map(|row| {
            let row = row.map_err(|e| ValidationError::Decode(e.to_string()))?;
            Ok(headers
                .iter()
                .zip(row.iter())
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .collect())
        })
        .collect()
}

fn decode_yaml(text: &str) -> Result<Vec<RawRecord>, ValidationError> {
    use serde_yaml::Value;

    let doc: Value =
        serde_yaml::from_str(text).map_err(|e| ValidationError::Decode(e.to_string()))?;

    let items = match doc {
        Value::Sequence(items) => items,
        Value::Null => return Err(not_a_sequence("an empty document")),
        Value::Mapping(_) => return Err(not_a_sequence("a mapping")),
        Value::Tagged(_) => return Err(not_a_sequence("a tagged value")),
        _ => return Err(not_a_sequence("a scalar")),
    };

    items
        .into_iter()
        .enumerate()
        .map(|(idx, item)| {
            let position = idx + 1;
            let Value::Mapping(map) = item else {
                return Err(malformed(position, "expected a mapping of fields"));
            };
            let mut record = RawRecord::new();
            for (key, value) in map {
                let key = yaml_scalar(key)
                    .ok_or_else(|| malformed(position, "field names must be scalars"))?;
                match value {
                    Value::Null => {}
                    other => {
                        let value = yaml_scalar(other).ok_or_else(|| {
                            malformed(position, &format!("field '{key}' must be a scalar"))
                        })?;
                        record.insert(key, value);
                    }
                }
            }
            Ok(record)
        })
        .collect()
}

fn yaml_scalar(value: serde_yaml::Value) -> Option<String> {
    use serde_yaml::Value;
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn decode_json(text: &str) -> Result<Vec<RawRecord>, ValidationError> {
    use serde_json::Value;

    let doc: Value =
        serde_json::from_str(text).map_err(|e| ValidationError::Decode(e.to_string()))?;

    let items = match doc {
        Value::Array(items) => items,
        Value::Object(_) => return Err(not_a_sequence("an object")),
        Value::Null => return Err(not_a_sequence("null")),
        _ => return Err(not_a_sequence("a scalar")),
    };

    items
        .into_iter()
        .enumerate()
        .map(|(idx, item)| {
            let position = idx + 1;
            let Value::Object(map) = item else {
                return Err(malformed(position, "expected an object of fields"));
            };
            let mut record = RawRecord::new();
            for (key, value) in map {
                match value {
                    Value::Null => {}
                    Value::String(s) => {
                        record.insert(key, s);
                    }
                    Value::Number(n) => {
                        record.insert(key, n.to_string());
                    }
                    Value::Bool(b) => {
                        record.insert(key, b.to_string());
                    }
                    Value::Array(_) | Value::Object(_) => {
                        return Err(malformed(position, &format!("field '{key}' must be a scalar")));
                    }
                }
            }
            Ok(record)
        })
        .collect()
}

fn not_a_sequence(found: &str) -> ValidationError {
    ValidationError::NotASequence {
        found: found.to_string(),
    }
}

fn malformed(record: usize, reason: &str) -> ValidationError {
    ValidationError::MalformedRecord {
        record,
        reason: reason.to_string(),
    }
}

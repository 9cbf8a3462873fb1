//! Upward migrations for archived records
//!
//! Archives written by an older schema are restored by upgrading each record
//! to the current shape before it reaches the host's decoder.
//!
//! Version history:
//! - v1: accounts carry the credential as a plain `password` string and no
//!   `user_data`
//! - v2: accounts carry `credential` (base64 bytes) and `user_data`

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::{Map, Value};

use crate::archive::CURRENT_SCHEMA_VERSION;
use crate::error::{BackupError, BackupResult};

/// Upgrade one portable account record from `from_version` to the current schema
pub fn upgrade_account(value: Value, from_version: u32) -> BackupResult<Value> {
    let mut record = match value {
        Value::Object(map) => map,
        other => {
            return Err(BackupError::Format(format!(
                "Account record must be an object, got {}",
                other
            )))
        }
    };

    let mut version = from_version;
    while version < CURRENT_SCHEMA_VERSION {
        match version {
            1 => v1_to_v2(&mut record)?,
            _ => {
                return Err(BackupError::Version {
                    found: u64::from(from_version),
                    min: crate::archive::MIN_SUPPORTED_SCHEMA_VERSION,
                    max: CURRENT_SCHEMA_VERSION,
                })
            }
        }
        version += 1;
    }

    Ok(Value::Object(record))
}

fn v1_to_v2(record: &mut Map<String, Value>) -> BackupResult<()> {
    if let Some(password) = record.remove("password") {
        let Value::String(password) = password else {
            return Err(BackupError::Format(
                "v1 account 'password' must be a string".to_string(),
            ));
        };
        record.insert(
            "credential".to_string(),
            Value::String(STANDARD.encode(password.as_bytes())),
        );
    }

    record
        .entry("user_data")
        .or_insert_with(|| Value::Object(Map::new()));

    Ok(())
}

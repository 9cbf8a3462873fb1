//! Archive descriptor
//!
//! The descriptor identifies the schema version an archive was written with
//! and when it was created. It is the first thing read on restore and gates
//! every other read.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{BackupError, BackupResult};
use crate::storage::file_io::write_bytes_atomic;

/// File name of the descriptor inside an archive folder
pub const DESCRIPTOR_FILE: &str = "descriptor";

/// Schema version written by this build
pub const CURRENT_SCHEMA_VERSION: u32 = 2;

/// Oldest schema version this build can still decode
pub const MIN_SUPPORTED_SCHEMA_VERSION: u32 = 1;

/// Version and creation time of an archive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Descriptor {
    #[serde(rename = "backup_schema_version")]
    pub schema_version: u32,

    /// Creation time in epoch milliseconds
    #[serde(rename = "created_date")]
    pub created_at_millis: i64,
}

impl Descriptor {
    /// A descriptor for a backup starting now
    pub fn new() -> Self {
        Self {
            schema_version: CURRENT_SCHEMA_VERSION,
            created_at_millis: Utc::now().timestamp_millis(),
        }
    }

    /// Creation time as a timestamp, if representable
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.created_at_millis).single()
    }

    /// Path of the descriptor file in `folder`
    pub fn path(folder: &Path) -> PathBuf {
        folder.join(DESCRIPTOR_FILE)
    }

    /// Create a fresh descriptor and write it to `folder`
    pub fn write(folder: &Path) -> BackupResult<Self> {
        let descriptor = Self::new();
        descriptor.store(folder)?;
        Ok(descriptor)
    }

    /// Write this descriptor to `folder` atomically
    pub fn store(&self, folder: &Path) -> BackupResult<()> {
        let bytes = serde_json::to_vec_pretty(self)?;
        let path = Self::path(folder);

        write_bytes_atomic(&path, &bytes).map_err(|e| {
            BackupError::Io(format!("Failed to write descriptor {}: {}", path.display(), e))
        })
    }

    /// Read and version-check the descriptor in `folder`
    pub fn read(folder: &Path) -> BackupResult<Self> {
        let path = Self::path(folder);

        let bytes = fs::read(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => BackupError::Format(format!(
                "No descriptor in {}: not a complete archive",
                folder.display()
            )),
            _ => BackupError::Io(format!("Failed to read descriptor {}: {}", path.display(), e)),
        })?;

        let raw: RawDescriptor = serde_json::from_slice(&bytes).map_err(|e| {
            BackupError::Format(format!("Malformed descriptor {}: {}", path.display(), e))
        })?;

        Ok(Self {
            schema_version: check_version(raw.schema_version)?,
            created_at_millis: raw.created_at_millis,
        })
    }

    /// Reject schema versions this build does not know how to decode
    pub fn check_version(&self) -> BackupResult<()> {
        check_version(u64::from(self.schema_version)).map(|_| ())
    }

    /// Whether the archive predates the current schema
    pub fn needs_migration(&self) -> bool {
        self.schema_version < CURRENT_SCHEMA_VERSION
    }
}

/// Descriptor as found on disk; the version may exceed anything we write
#[derive(Deserialize)]
struct RawDescriptor {
    #[serde(rename = "backup_schema_version")]
    schema_version: u64,
    #[serde(rename = "created_date")]
    created_at_millis: i64,
}

fn check_version(found: u64) -> BackupResult<u32> {
    let supported = u64::from(MIN_SUPPORTED_SCHEMA_VERSION)..=u64::from(CURRENT_SCHEMA_VERSION);
    if supported.contains(&found) {
        u32::try_from(found).map_err(|_| unsupported(found))
    } else {
        Err(unsupported(found))
    }
}

fn unsupported(found: u64) -> BackupError {
    BackupError::Version {
        found,
        min: MIN_SUPPORTED_SCHEMA_VERSION,
        max: CURRENT_SCHEMA_VERSION,
    }
}

impl Default for Descriptor {
    fn default() -> Self {
        Self::new()
    }
}

//! Custom error types for statepack
//!
//! This module defines the error hierarchy for the backup engine using
//! thiserror for ergonomic error definitions.

use thiserror::Error;

use crate::backup::{BackupReport, RestoreReport};

/// The main error type for statepack operations
#[derive(Error, Debug, Clone)]
pub enum BackupError {
    /// Filesystem unavailable or unwritable
    #[error("I/O error: {0}")]
    Io(String),

    /// A descriptor, header or payload does not parse
    #[error("Format error: {0}")]
    Format(String),

    /// Archive schema is not one this build can decode
    #[error("Unsupported archive schema version {found} (supported: {min}-{max})")]
    Version { found: u64, min: u32, max: u32 },

    /// Persisted payload length disagrees with its header
    #[error("Size mismatch for '{key}': header declares {expected} bytes, payload has {actual}")]
    SizeMismatch {
        key: String,
        expected: u64,
        actual: u64,
    },

    /// Header carries an encoding tag this reader does not know
    #[error("Unknown encoding '{tag}' for '{key}'")]
    UnknownEncoding { key: String, tag: String },

    /// The same key was written twice in one backup session
    #[error("Duplicate data unit key: {0}")]
    DuplicateKey(String),

    /// Key cannot be used to name archive artifacts
    #[error("Invalid data unit key: '{0}'")]
    InvalidKey(String),

    /// An expected data unit is absent from the archive
    #[error("Missing data unit: {0}")]
    MissingUnit(String),

    /// Host store (preferences, database, accounts) failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Operation called without the matching prepare step
    #[error("Not prepared: {0}")]
    NotPrepared(&'static str),

    /// Entity not found errors
    #[error("{entity_type} not found: {identifier}")]
    NotFound {
        entity_type: &'static str,
        identifier: String,
    },

    /// Backup ran but the failure policy rejects the outcome
    #[error("Backup failed: {}", .0.summary())]
    BackupFailed(Box<BackupReport>),

    /// Restore ran but the failure policy rejects the outcome
    #[error("Restore failed: {}", .0.summary())]
    RestoreFailed(Box<RestoreReport>),
}

impl BackupError {
    /// Create a size mismatch error for a unit
    pub fn size_mismatch(key: impl Into<String>, expected: u64, actual: u64) -> Self {
        Self::SizeMismatch {
            key: key.into(),
            expected,
            actual,
        }
    }

    /// Create an "archive not found" error
    pub fn archive_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Archive",
            identifier: identifier.into(),
        }
    }

    /// Errors that end the whole backup/restore session rather than one unit
    pub fn is_session_fatal(&self) -> bool {
        matches!(self, Self::Io(_) | Self::DuplicateKey(_))
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<std::io::Error> for BackupError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for BackupError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

/// Result type alias for statepack operations
pub type BackupResult<T> = Result<T, BackupError>;

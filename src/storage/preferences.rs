//! Preference repository for JSON storage
//!
//! Manages loading and saving preferences to preferences.json

use std::path::PathBuf;
use std::sync::RwLock;

use crate::error::BackupError;
use crate::host::PreferenceStore;
use crate::models::Preferences;

use super::file_io::{read_json, write_json_atomic};

/// Repository for preference persistence
pub struct PreferenceRepository {
    path: PathBuf,
    data: RwLock<Preferences>,
}

impl PreferenceRepository {
    /// Create a new preference repository
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            data: RwLock::new(Preferences::new()),
        }
    }

    /// Load preferences from disk
    pub fn load(&self) -> Result<(), BackupError> {
        let file_data: Preferences = read_json(&self.path)?;

        let mut data = self.data.write().map_err(|e| {
            BackupError::Storage(format!("Failed to acquire write lock: {}", e))
        })?;
        *data = file_data;

        Ok(())
    }
}

impl PreferenceStore for PreferenceRepository {
    fn get_all(&self) -> Result<Preferences, BackupError> {
        let data = self.data.read().map_err(|e| {
            BackupError::Storage(format!("Failed to acquire read lock: {}", e))
        })?;

        Ok(data.clone())
    }

    fn put_all(&self, preferences: Preferences) -> Result<(), BackupError> {
        // Persist first so memory never runs ahead of disk
        write_json_atomic(&self.path, &preferences)?;

        let mut data = self.data.write().map_err(|e| {
            BackupError::Storage(format!("Failed to acquire write lock: {}", e))
        })?;
        *data = preferences;

        Ok(())
    }
}

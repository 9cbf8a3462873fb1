//! Storage layer for statepack
//!
//! File-backed host stores: JSON files with atomic writes and automatic
//! directory creation. `Storage` wires them into a `Host` for the engine.

pub mod accounts;
pub mod database;
pub mod file_io;
pub mod preferences;

pub use accounts::AccountRepository;
pub use database::TableDatabase;
pub use file_io::{read_json, write_json_atomic};
pub use preferences::PreferenceRepository;

use crate::config::paths::StatePaths;
use crate::config::settings::Settings;
use crate::error::BackupError;
use crate::host::Host;

/// Main storage coordinator that provides access to all repositories
pub struct Storage {
    pub preferences: PreferenceRepository,
    pub accounts: AccountRepository,
    pub databases: Vec<TableDatabase>,
}

impl Storage {
    /// Create a new Storage instance for the databases named in `settings`
    pub fn new(paths: &StatePaths, settings: &Settings) -> Result<Self, BackupError> {
        paths.ensure_directories()?;

        let databases = settings
            .databases
            .iter()
            .map(|name| TableDatabase::new(name.clone(), paths.database_file(name)))
            .collect();

        Ok(Self {
            preferences: PreferenceRepository::new(paths.preferences_file()),
            accounts: AccountRepository::new(paths.accounts_file()),
            databases,
        })
    }

    /// Load preferences and accounts from disk
    ///
    /// Databases load themselves when opened.
    pub fn load_all(&mut self) -> Result<(), BackupError> {
        self.preferences.load()?;
        self.accounts.load()?;
        Ok(())
    }

    /// Hand the stores over to the backup engine
    pub fn into_host(self) -> Host {
        let mut host = Host::new(Box::new(self.preferences), Box::new(self.accounts));
        for database in self.databases {
            host = host.with_database(Box::new(database));
        }
        host
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_storage_creation() {
        let temp_dir = TempDir::new().unwrap();
        let paths = StatePaths::with_base_dir(temp_dir.path().to_path_buf());
        let mut settings = Settings::default();
        settings.databases = vec!["mail".into(), "contacts".into()];

        let storage = Storage::new(&paths, &settings).unwrap();

        assert!(temp_dir.path().join("data").join("databases").exists());
        assert!(temp_dir.path().join("backups").exists());

        let host = storage.into_host();
        let names: Vec<_> = host.sorted_databases().iter().map(|d| d.name().to_string()).collect();
        assert_eq!(names, vec!["contacts", "mail"]);
    }
}

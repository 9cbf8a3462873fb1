//! Account repository for JSON storage
//!
//! Manages loading and saving accounts to accounts.json

use std::path::PathBuf;
use std::sync::RwLock;

use crate::error::BackupError;
use crate::host::AccountStore;
use crate::models::Account;

use super::file_io::{read_json, write_json_atomic};

/// Serializable account data structure
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
struct AccountData {
    accounts: Vec<Account>,
}

/// Repository for account persistence
///
/// Accounts keep their insertion order, which is also the order they are
/// archived in.
pub struct AccountRepository {
    path: PathBuf,
    data: RwLock<Vec<Account>>,
}

impl AccountRepository {
    /// Create a new account repository
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            data: RwLock::new(Vec::new()),
        }
    }

    /// Load accounts from disk
    pub fn load(&self) -> Result<(), BackupError> {
        let file_data: AccountData = read_json(&self.path)?;

        let mut data = self.data.write().map_err(|e| {
            BackupError::Storage(format!("Failed to acquire write lock: {}", e))
        })?;
        *data = file_data.accounts;

        Ok(())
    }
}

impl AccountStore for AccountRepository {
    fn accounts(&self) -> Result<Vec<Account>, BackupError> {
        let data = self.data.read().map_err(|e| {
            BackupError::Storage(format!("Failed to acquire read lock: {}", e))
        })?;

        Ok(data.clone())
    }

    fn replace_all(&self, accounts: Vec<Account>) -> Result<(), BackupError> {
        write_json_atomic(
            &self.path,
            &AccountData {
                accounts: accounts.clone(),
            },
        )?;

        let mut data = self.data.write().map_err(|e| {
            BackupError::Storage(format!("Failed to acquire write lock: {}", e))
        })?;
        *data = accounts;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Credential;
    use tempfile::TempDir;

    fn create_test_repo() -> (TempDir, AccountRepository) {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("accounts.json");
        let repo = AccountRepository::new(path);
        (temp_dir, repo)
    }

    #[test]
    fn test_empty_load() {
        let (_temp_dir, repo) = create_test_repo();
        repo.load().unwrap();
        assert!(repo.accounts().unwrap().is_empty());
    }

    #[test]
    fn test_replace_all_persists_in_order() {
        let (temp_dir, repo) = create_test_repo();
        repo.replace_all(vec![Account::new("old", "imap", Credential::new("0"))])
            .unwrap();

        let fresh = vec![
            Account::new("zed", "imap", Credential::new("1")),
            Account::new("amy", "pop", Credential::new("2")),
        ];
        repo.replace_all(fresh.clone()).unwrap();
        assert_eq!(repo.accounts().unwrap(), fresh);

        let repo2 = AccountRepository::new(temp_dir.path().join("accounts.json"));
        repo2.load().unwrap();
        let names: Vec<_> = repo2.accounts().unwrap().into_iter().map(|a| a.name).collect();
        assert_eq!(names, vec!["zed", "amy"]);
    }

    #[test]
    fn test_load_rejects_malformed_file() {
        let (temp_dir, repo) = create_test_repo();
        std::fs::write(temp_dir.path().join("accounts.json"), "{\"accounts\": 3}").unwrap();
        assert!(repo.load().is_err());
    }
}

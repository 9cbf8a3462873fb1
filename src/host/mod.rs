//! Host collaborators
//!
//! The backup engine never touches application state directly. It goes
//! through three narrow interfaces the host implements:
//!
//! - `PreferenceStore`: get-all / put-all of flat settings
//! - `DatabaseHandle`: open / close / dump / load of one database
//! - `AccountStore`: enumerate accounts and convert them to and from
//!   portable JSON
//!
//! `Host` bundles one preference store, any number of databases and one
//! account store. File-backed implementations live in `storage`; shared
//! in-memory ones in `memory`.

pub mod memory;

use serde_json::Value;

use crate::error::{BackupError, BackupResult};
use crate::models::{Account, DatabaseDump, Preferences};

/// Flat settings store
pub trait PreferenceStore {
    /// Every preference currently set
    fn get_all(&self) -> BackupResult<Preferences>;

    /// Replace the whole preference set in one step
    fn put_all(&self, preferences: Preferences) -> BackupResult<()>;
}

/// One row-oriented database
pub trait DatabaseHandle {
    /// Stable database name
    fn name(&self) -> &str;

    fn open(&self) -> BackupResult<()>;

    fn close(&self) -> BackupResult<()>;

    /// Full contents; the handle must be open
    fn dump(&self) -> BackupResult<DatabaseDump>;

    /// Replace the full contents; the handle must be open
    fn load(&self, dump: DatabaseDump) -> BackupResult<()>;
}

/// Account credential store
pub trait AccountStore {
    /// All accounts, in the store's order
    fn accounts(&self) -> BackupResult<Vec<Account>>;

    /// Replace the account list
    fn replace_all(&self, accounts: Vec<Account>) -> BackupResult<()>;

    /// Portable JSON form of one account
    fn to_portable_json(&self, account: &Account) -> BackupResult<Value> {
        Ok(serde_json::to_value(account)?)
    }

    /// Rebuild an account from its portable JSON form
    fn from_portable_json(&self, value: Value) -> BackupResult<Account> {
        let account: Account = serde_json::from_value(value)
            .map_err(|e| BackupError::Format(format!("Invalid account record: {}", e)))?;
        account
            .validate()
            .map_err(|e| BackupError::Format(format!("Invalid account '{}': {}", account.id, e)))?;
        Ok(account)
    }
}

/// The state a backup captures and a restore repopulates
pub struct Host {
    pub preferences: Box<dyn PreferenceStore>,
    pub databases: Vec<Box<dyn DatabaseHandle>>,
    pub accounts: Box<dyn AccountStore>,
}

impl Host {
    /// Create a host with no databases
    pub fn new(preferences: Box<dyn PreferenceStore>, accounts: Box<dyn AccountStore>) -> Self {
        Self {
            preferences,
            databases: Vec::new(),
            accounts,
        }
    }

    /// Register a database
    pub fn with_database(mut self, database: Box<dyn DatabaseHandle>) -> Self {
        self.databases.push(database);
        self
    }

    /// Databases sorted by name, the order they are archived in
    pub fn sorted_databases(&self) -> Vec<&dyn DatabaseHandle> {
        let mut databases: Vec<&dyn DatabaseHandle> =
            self.databases.iter().map(|d| d.as_ref()).collect();
        databases.sort_by_key(|d| d.name().to_lowercase());
        databases
    }
}

impl std::fmt::Debug for Host {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.databases.iter().map(|d| d.name()).collect();
        f.debug_struct("Host").field("databases", &names).finish()
    }
}

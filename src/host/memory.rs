//! In-memory host stores
//!
//! Every store is a cheap handle over shared state: clone one before handing
//! it to a `Host` and the clone keeps observing what the engine reads and
//! writes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use serde_json::{Map, Value};

use super::{AccountStore, DatabaseHandle, PreferenceStore};
use crate::error::{BackupError, BackupResult};
use crate::models::{Account, DatabaseDump, PreferenceValue, Preferences, TableRow};

fn lock_error(e: impl std::fmt::Display) -> BackupError {
    BackupError::Storage(format!("Failed to acquire lock: {}", e))
}

/// Shared in-memory preference store
#[derive(Debug, Clone, Default)]
pub struct MemoryPreferences {
    data: Arc<RwLock<Preferences>>,
}

impl MemoryPreferences {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set one preference
    pub fn set(&self, key: impl Into<String>, value: impl Into<PreferenceValue>) -> BackupResult<()> {
        let mut data = self.data.write().map_err(lock_error)?;
        data.insert(key.into(), value.into());
        Ok(())
    }

    /// Drop every preference
    pub fn clear(&self) -> BackupResult<()> {
        self.data.write().map_err(lock_error)?.clear();
        Ok(())
    }
}

impl PreferenceStore for MemoryPreferences {
    fn get_all(&self) -> BackupResult<Preferences> {
        Ok(self.data.read().map_err(lock_error)?.clone())
    }

    fn put_all(&self, preferences: Preferences) -> BackupResult<()> {
        *self.data.write().map_err(lock_error)? = preferences;
        Ok(())
    }
}

/// Shared in-memory database
#[derive(Debug, Clone)]
pub struct MemoryDatabase {
    name: String,
    contents: Arc<RwLock<DatabaseDump>>,
    open: Arc<AtomicBool>,
}

impl MemoryDatabase {
    /// An empty row-oriented database
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_contents(name, DatabaseDump::Rows(Vec::new()))
    }

    /// A database whose dump is an opaque byte image
    pub fn raw(name: impl Into<String>, image: Vec<u8>) -> Self {
        Self::with_contents(name, DatabaseDump::Raw(image))
    }

    fn with_contents(name: impl Into<String>, contents: DatabaseDump) -> Self {
        Self {
            name: name.into(),
            contents: Arc::new(RwLock::new(contents)),
            open: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Append a row to `table`
    pub fn insert(&self, table: &str, values: Map<String, Value>) -> BackupResult<()> {
        let mut contents = self.contents.write().map_err(lock_error)?;
        match &mut *contents {
            DatabaseDump::Rows(rows) => {
                rows.push(TableRow::new(table, values));
                Ok(())
            }
            DatabaseDump::Raw(_) => Err(BackupError::Storage(format!(
                "Database '{}' holds a raw image",
                self.name
            ))),
        }
    }

    /// Number of rows, or 1 for a raw image
    pub fn row_count(&self) -> BackupResult<usize> {
        Ok(self.contents.read().map_err(lock_error)?.entity_count())
    }

    /// Current contents
    pub fn contents(&self) -> BackupResult<DatabaseDump> {
        Ok(self.contents.read().map_err(lock_error)?.clone())
    }

    /// Drop every row
    pub fn wipe(&self) -> BackupResult<()> {
        let mut contents = self.contents.write().map_err(lock_error)?;
        *contents = match &*contents {
            DatabaseDump::Rows(_) => DatabaseDump::Rows(Vec::new()),
            DatabaseDump::Raw(_) => DatabaseDump::Raw(Vec::new()),
        };
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn ensure_open(&self) -> BackupResult<()> {
        if self.is_open() {
            Ok(())
        } else {
            Err(BackupError::Storage(format!("Database '{}' is not open", self.name)))
        }
    }
}

impl DatabaseHandle for MemoryDatabase {
    fn name(&self) -> &str {
        &self.name
    }

    fn open(&self) -> BackupResult<()> {
        self.open.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn close(&self) -> BackupResult<()> {
        self.open.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn dump(&self) -> BackupResult<DatabaseDump> {
        self.ensure_open()?;
        self.contents()
    }

    fn load(&self, dump: DatabaseDump) -> BackupResult<()> {
        self.ensure_open()?;
        *self.contents.write().map_err(lock_error)? = dump;
        Ok(())
    }
}

/// Shared in-memory account list
#[derive(Debug, Clone, Default)]
pub struct MemoryAccounts {
    data: Arc<RwLock<Vec<Account>>>,
}

impl MemoryAccounts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an account
    pub fn add(&self, account: Account) -> BackupResult<()> {
        self.data.write().map_err(lock_error)?.push(account);
        Ok(())
    }

    /// Drop every account
    pub fn clear(&self) -> BackupResult<()> {
        self.data.write().map_err(lock_error)?.clear();
        Ok(())
    }
}

impl AccountStore for MemoryAccounts {
    fn accounts(&self) -> BackupResult<Vec<Account>> {
        Ok(self.data.read().map_err(lock_error)?.clone())
    }

    fn replace_all(&self, accounts: Vec<Account>) -> BackupResult<()> {
        *self.data.write().map_err(lock_error)? = accounts;
        Ok(())
    }
}

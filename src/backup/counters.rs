//! Per-call outcome counters
//!
//! A fresh `BackupCounters` is created for every backup or restore and
//! passed by `&mut` into the agent.

use std::fmt;

use crate::config::FailurePolicy;
use crate::error::BackupError;

/// Logical data sets an archive carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataSet {
    Preferences,
    Databases,
    Accounts,
}

impl fmt::Display for DataSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Preferences => write!(f, "preferences"),
            Self::Databases => write!(f, "databases"),
            Self::Accounts => write!(f, "accounts"),
        }
    }
}

/// A data unit (or one element of it) that could not be processed
#[derive(Debug, Clone)]
pub struct UnitFailure {
    pub data_set: DataSet,
    pub key: String,
    pub error: BackupError,
}

impl fmt::Display for UnitFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.key, self.data_set, self.error)
    }
}

/// Outcome counts for one backup or restore
#[derive(Debug, Clone, Default)]
pub struct BackupCounters {
    pub preferences_backed_up: u32,
    pub preferences_restored: u32,
    pub databases_backed_up: u32,
    pub databases_restored: u32,
    /// Databases the operation attempted
    pub databases_total: u32,
    pub accounts_backed_up: u32,
    pub accounts_restored: u32,
    /// Account count declared by the archive's `account_header`
    pub accounts_declared: u32,
    pub units_written: u32,
    pub bytes_written: u64,
    pub failures: Vec<UnitFailure>,
    /// Keys present in the archive that no data set claims
    pub unexpected_keys: Vec<String>,
}

impl BackupCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a per-unit failure
    pub fn record_failure(&mut self, data_set: DataSet, key: impl Into<String>, error: BackupError) {
        self.failures.push(UnitFailure {
            data_set,
            key: key.into(),
            error,
        });
    }

    /// Whether any failure was recorded against `data_set`
    pub fn failed(&self, data_set: DataSet) -> bool {
        self.failures.iter().any(|f| f.data_set == data_set)
    }

    /// Whether the recorded outcome is a success under `policy`
    pub fn satisfies(&self, policy: FailurePolicy) -> bool {
        match policy {
            FailurePolicy::Partial => {
                !self.failed(DataSet::Preferences) && !self.failed(DataSet::Accounts)
            }
            FailurePolicy::AllOrNothing => self.failures.is_empty(),
        }
    }
}

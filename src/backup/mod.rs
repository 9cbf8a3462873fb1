//! Backup engine for statepack
//!
//! Captures a host's state into a versioned archive folder and replays it.
//!
//! # Architecture
//!
//! - `BackupManager`: prepares destinations and sources, owns the
//!   transaction, applies the failure policy and returns reports
//! - `BackupAgent`: decides which data sets are written and restored, in
//!   which order, and counts outcomes
//! - `ArchiveCatalog`: lists, resolves and prunes archives in a backup
//!   directory
//!
//! # Data sets
//!
//! Every archive carries, in write order:
//! - `preferences`: the full preference set as one JSON object
//! - one unit per database, keyed by its lowercase name
//! - `account_header`: `account_count` and `data_size` of the account data
//! - `account_data`: one portable JSON record per account
//!
//! # Example
//!
//! ```rust,ignore
//! use statepack::backup::BackupManager;
//!
//! let mut manager = BackupManager::new(host);
//! manager.prepare_for_backup(&target)?;
//! let report = manager.backup()?;
//! println!("{}", report.summary());
//!
//! // Later, on the same or a newer version
//! manager.prepare_for_restore(&target)?;
//! let report = manager.restore()?;
//! ```

mod agent;
mod catalog;
mod counters;
mod manager;
mod migrate;
mod report;

pub use agent::{
    BackupAgent, ACCOUNT_DATA_KEY, ACCOUNT_HEADER_KEY, PREFERENCES_KEY, RESERVED_KEYS,
};
pub use catalog::{ArchiveCatalog, ArchiveInfo};
pub use counters::{BackupCounters, DataSet, UnitFailure};
pub use manager::BackupManager;
pub use migrate::upgrade_account;
pub use report::{ArchiveSummary, BackupReport, RestoreReport, UnitStatus};

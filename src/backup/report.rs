//! Structured results of backup, restore and inspection

use std::path::PathBuf;

use crate::archive::{Descriptor, UnitHeader};
use crate::error::BackupError;

use super::counters::{BackupCounters, UnitFailure};

/// Result of a backup operation
#[derive(Debug, Clone)]
pub struct BackupReport {
    /// Archive folder written
    pub archive: PathBuf,
    /// Descriptor committed (or that would have been, on failure)
    pub descriptor: Descriptor,
    pub counters: BackupCounters,
}

impl BackupReport {
    /// Check if every data set was captured
    pub fn is_complete(&self) -> bool {
        self.counters.failures.is_empty()
    }

    pub fn failures(&self) -> &[UnitFailure] {
        &self.counters.failures
    }

    /// Get a summary of what was backed up
    pub fn summary(&self) -> String {
        let c = &self.counters;
        let mut summary = format!(
            "preferences: {}, databases: {}/{}, accounts: {}, {} units ({} bytes)",
            if c.preferences_backed_up == 1 { "ok" } else { "failed" },
            c.databases_backed_up,
            c.databases_total,
            c.accounts_backed_up,
            c.units_written,
            c.bytes_written
        );
        if !c.failures.is_empty() {
            summary.push_str(&format!(", {} failure(s)", c.failures.len()));
        }
        summary
    }
}

/// Result of a restore operation
#[derive(Debug, Clone)]
pub struct RestoreReport {
    /// Archive folder read
    pub archive: PathBuf,
    pub descriptor: Descriptor,
    pub counters: BackupCounters,
}

impl RestoreReport {
    /// Check if all data was restored
    pub fn is_complete(&self) -> bool {
        self.counters.failures.is_empty()
    }

    pub fn failures(&self) -> &[UnitFailure] {
        &self.counters.failures
    }

    /// Whether the archive predates the current schema
    pub fn migrated(&self) -> bool {
        self.descriptor.needs_migration()
    }

    /// Get a summary of what was restored
    pub fn summary(&self) -> String {
        let c = &self.counters;
        let mut summary = format!(
            "preferences: {}, databases: {}/{}, accounts: {}/{}",
            if c.preferences_restored == 1 { "ok" } else { "failed" },
            c.databases_restored,
            c.databases_total,
            c.accounts_restored,
            c.accounts_declared
        );
        if !c.failures.is_empty() {
            summary.push_str(&format!(", {} failure(s)", c.failures.len()));
        }
        if !c.unexpected_keys.is_empty() {
            summary.push_str(&format!(", ignored: {}", c.unexpected_keys.join(", ")));
        }
        summary
    }
}

/// Validation outcome of one unit
#[derive(Debug, Clone)]
pub struct UnitStatus {
    pub key: String,
    pub result: Result<UnitHeader, BackupError>,
}

impl UnitStatus {
    pub fn is_valid(&self) -> bool {
        self.result.is_ok()
    }
}

/// Result of inspecting an archive without restoring it
#[derive(Debug, Clone)]
pub struct ArchiveSummary {
    pub archive: PathBuf,
    pub descriptor: Descriptor,
    /// Every unit found, in key order
    pub units: Vec<UnitStatus>,
    /// Required units that are absent
    pub missing: Vec<String>,
}

impl ArchiveSummary {
    /// Whether every unit validates and none are missing
    pub fn is_valid(&self) -> bool {
        self.missing.is_empty() && self.units.iter().all(UnitStatus::is_valid)
    }

    /// Total payload bytes across valid units
    pub fn total_bytes(&self) -> u64 {
        self.units
            .iter()
            .filter_map(|u| u.result.as_ref().ok())
            .map(|h| h.size_bytes)
            .sum()
    }

    /// Get a summary of the archive's contents
    pub fn summary(&self) -> String {
        let invalid = self.units.iter().filter(|u| !u.is_valid()).count();
        let mut summary = format!(
            "schema v{}, {} units, {} bytes",
            self.descriptor.schema_version,
            self.units.len(),
            self.total_bytes()
        );
        if invalid > 0 {
            summary.push_str(&format!(", {} corrupt", invalid));
        }
        if !self.missing.is_empty() {
            summary.push_str(&format!(", missing: {}", self.missing.join(", ")));
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::Encoding;
    use crate::backup::counters::DataSet;

    #[test]
    fn test_backup_summary() {
        let mut counters = BackupCounters::new();
        counters.preferences_backed_up = 1;
        counters.databases_backed_up = 1;
        counters.databases_total = 2;
        counters.units_written = 4;
        counters.bytes_written = 120;
        counters.record_failure(
            DataSet::Databases,
            "mail",
            BackupError::Storage("locked".into()),
        );

        let report = BackupReport {
            archive: PathBuf::from("/tmp/a"),
            descriptor: Descriptor::new(),
            counters,
        };

        assert!(!report.is_complete());
        assert_eq!(
            report.summary(),
            "preferences: ok, databases: 1/2, accounts: 0, 4 units (120 bytes), 1 failure(s)"
        );
    }

    #[test]
    fn test_archive_summary_validity() {
        let header = UnitHeader {
            key: "preferences".into(),
            size_bytes: 10,
            entity_count: 1,
            encoding: Encoding::JsonObject,
        };
        let mut summary = ArchiveSummary {
            archive: PathBuf::from("/tmp/a"),
            descriptor: Descriptor::new(),
            units: vec![UnitStatus {
                key: "preferences".into(),
                result: Ok(header),
            }],
            missing: Vec::new(),
        };
        assert!(summary.is_valid());
        assert_eq!(summary.total_bytes(), 10);

        summary.units.push(UnitStatus {
            key: "mail".into(),
            result: Err(BackupError::size_mismatch("mail", 5, 4)),
        });
        assert!(!summary.is_valid());
        assert!(summary.summary().contains("1 corrupt"));
    }
}

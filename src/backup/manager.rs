//! Backup manager for statepack
//!
//! Owns the backup/restore transaction. A backup is prepared against a
//! destination folder, then run; the descriptor is committed last and only
//! when the failure policy accepts the outcome, so an incomplete archive is
//! never restorable. A restore is prepared by validating the descriptor,
//! then run.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{error, info, warn};

use crate::archive::{ArchiveProvider, Descriptor, FolderArchive, UnitReader, UnitWriter};
use crate::config::settings::{FailurePolicy, Settings};
use crate::error::{BackupError, BackupResult};
use crate::host::Host;

use super::agent::{BackupAgent, ACCOUNT_DATA_KEY, ACCOUNT_HEADER_KEY};
use super::counters::BackupCounters;
use super::report::{ArchiveSummary, BackupReport, RestoreReport, UnitStatus};

struct PendingBackup<W> {
    folder: PathBuf,
    descriptor: Descriptor,
    writer: W,
}

struct PendingRestore<R> {
    folder: PathBuf,
    descriptor: Descriptor,
    reader: R,
}

/// Orchestrates backups and restores of one host
pub struct BackupManager<P: ArchiveProvider = FolderArchive> {
    provider: P,
    host: Host,
    require_empty_destination: bool,
    failure_policy: FailurePolicy,
    pending_backup: Option<PendingBackup<P::Writer>>,
    pending_restore: Option<PendingRestore<P::Reader>>,
}

impl BackupManager<FolderArchive> {
    /// Create a manager writing plain archive folders
    pub fn new(host: Host) -> Self {
        Self::with_provider(FolderArchive, host)
    }

    /// Create a manager configured from user settings
    pub fn from_settings(host: Host, settings: &Settings) -> Self {
        Self::new(host)
            .require_empty_destination(settings.require_empty_destination)
            .failure_policy(settings.failure_policy)
    }
}

impl<P: ArchiveProvider> BackupManager<P> {
    /// Create a manager over a custom archive provider
    pub fn with_provider(provider: P, host: Host) -> Self {
        Self {
            provider,
            host,
            require_empty_destination: true,
            failure_policy: FailurePolicy::default(),
            pending_backup: None,
            pending_restore: None,
        }
    }

    pub fn require_empty_destination(mut self, required: bool) -> Self {
        self.require_empty_destination = required;
        self
    }

    pub fn failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn host(&self) -> &Host {
        &self.host
    }

    /// Create or validate `target` and open a writer on it
    ///
    /// Returns the descriptor that `backup` will commit.
    pub fn prepare_for_backup(&mut self, target: &Path) -> BackupResult<Descriptor> {
        if target.exists() && !target.is_dir() {
            return Err(BackupError::Io(format!(
                "Backup destination is not a directory: {}",
                target.display()
            )));
        }

        fs::create_dir_all(target).map_err(|e| {
            BackupError::Io(format!(
                "Failed to create backup destination {}: {}",
                target.display(),
                e
            ))
        })?;

        if self.require_empty_destination {
            let mut entries = fs::read_dir(target).map_err(|e| {
                BackupError::Io(format!("Failed to read {}: {}", target.display(), e))
            })?;
            if entries.next().is_some() {
                return Err(BackupError::Io(format!(
                    "Backup destination is not empty: {}",
                    target.display()
                )));
            }
        }

        let writer = self.provider.open_writer(target)?;
        let descriptor = Descriptor::new();
        self.pending_backup = Some(PendingBackup {
            folder: target.to_path_buf(),
            descriptor,
            writer,
        });

        info!(target = %target.display(), "Prepared backup");
        Ok(descriptor)
    }

    /// Descriptor of the prepared backup or restore
    pub fn descriptor(&self) -> Option<Descriptor> {
        self.pending_backup
            .as_ref()
            .map(|p| p.descriptor)
            .or_else(|| self.pending_restore.as_ref().map(|p| p.descriptor))
    }

    /// Where the prepared backup's descriptor will be committed
    pub fn descriptor_path(&self) -> Option<PathBuf> {
        self.pending_backup
            .as_ref()
            .map(|p| Descriptor::path(&p.folder))
    }

    /// Run the prepared backup
    pub fn backup(&mut self) -> BackupResult<BackupReport> {
        let PendingBackup {
            folder,
            descriptor,
            mut writer,
        } = self
            .pending_backup
            .take()
            .ok_or(BackupError::NotPrepared("call prepare_for_backup before backup"))?;

        let mut counters = BackupCounters::new();
        let outcome = BackupAgent::new(&self.host).backup(&mut writer, &mut counters);
        let closed = writer.close();
        outcome?;
        closed?;

        let report = BackupReport {
            archive: folder,
            descriptor,
            counters,
        };

        if !report.counters.satisfies(self.failure_policy) {
            error!(archive = %report.archive.display(), summary = %report.summary(), "Backup failed");
            return Err(BackupError::BackupFailed(Box::new(report)));
        }

        self.provider.write_descriptor(&report.archive, &descriptor)?;

        if report.is_complete() {
            info!(archive = %report.archive.display(), summary = %report.summary(), "Backup complete");
        } else {
            warn!(archive = %report.archive.display(), summary = %report.summary(), "Backup completed with warnings");
        }
        Ok(report)
    }

    /// Validate the descriptor in `source` and open a reader on it
    pub fn prepare_for_restore(&mut self, source: &Path) -> BackupResult<Descriptor> {
        if !source.is_dir() {
            return Err(BackupError::Io(format!(
                "Archive folder does not exist: {}",
                source.display()
            )));
        }

        let descriptor = self.provider.read_descriptor(source)?;
        let reader = self.provider.open_reader(source)?;
        self.pending_restore = Some(PendingRestore {
            folder: source.to_path_buf(),
            descriptor,
            reader,
        });

        info!(
            source = %source.display(),
            schema_version = descriptor.schema_version,
            "Prepared restore"
        );
        Ok(descriptor)
    }

    /// Run the prepared restore
    pub fn restore(&mut self) -> BackupResult<RestoreReport> {
        let PendingRestore {
            folder,
            descriptor,
            mut reader,
        } = self
            .pending_restore
            .take()
            .ok_or(BackupError::NotPrepared("call prepare_for_restore before restore"))?;

        if descriptor.needs_migration() {
            info!(
                from = descriptor.schema_version,
                "Archive uses an older schema; records will be upgraded"
            );
        }

        let mut counters = BackupCounters::new();
        let outcome = BackupAgent::for_archive(&self.host, &descriptor).restore(&reader, &mut counters);
        let closed = reader.close();
        outcome?;
        closed?;

        let report = RestoreReport {
            archive: folder,
            descriptor,
            counters,
        };

        if !report.counters.satisfies(self.failure_policy) {
            error!(archive = %report.archive.display(), summary = %report.summary(), "Restore failed");
            return Err(BackupError::RestoreFailed(Box::new(report)));
        }

        if report.is_complete() {
            info!(archive = %report.archive.display(), summary = %report.summary(), "Restore complete");
        } else {
            warn!(archive = %report.archive.display(), summary = %report.summary(), "Restore completed with warnings");
        }
        Ok(report)
    }

    /// Validate an archive and every unit in it without restoring anything
    pub fn inspect(&self, folder: &Path) -> BackupResult<ArchiveSummary> {
        if !folder.is_dir() {
            return Err(BackupError::Io(format!(
                "Archive folder does not exist: {}",
                folder.display()
            )));
        }

        let descriptor = self.provider.read_descriptor(folder)?;
        let mut reader = self.provider.open_reader(folder)?;
        let keys = reader.list_keys()?;

        let mut units: Vec<UnitStatus> = keys
            .iter()
            .map(|key| UnitStatus {
                key: key.clone(),
                result: reader.read_unit(key).map(|unit| unit.header()),
            })
            .collect();

        let agent = BackupAgent::for_archive(&self.host, &descriptor);

        // Both account units parse on their own; they must also agree
        let header_ok = units
            .iter()
            .any(|u| u.key == ACCOUNT_HEADER_KEY && u.is_valid());
        if let Some(data) = units
            .iter_mut()
            .find(|u| u.key == ACCOUNT_DATA_KEY && u.is_valid())
        {
            if header_ok {
                if let Err(e) = agent.check_accounts(&reader) {
                    data.result = Err(e);
                }
            }
        }

        let missing = agent.expected_keys().difference(&keys).cloned().collect();

        reader.close()?;

        Ok(ArchiveSummary {
            archive: folder.to_path_buf(),
            descriptor,
            units,
            missing,
        })
    }

    /// Drop any prepared backup or restore without running it
    pub fn cancel(&mut self) {
        self.pending_backup = None;
        self.pending_restore = None;
    }
}

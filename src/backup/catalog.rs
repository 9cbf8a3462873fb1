//! Archive catalog
//!
//! Lists the archives under a backup directory, resolves archive names
//! (including `latest`) and enforces the retention policy. Only folders
//! with a readable descriptor count as archives. A folder left behind by a
//! failed backup is never listed, and retention removes it if the catalog
//! named it.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::archive::Descriptor;
use crate::config::settings::BackupRetention;
use crate::error::{BackupError, BackupResult};

/// Name prefix of folders created by `next_archive_path`
pub const ARCHIVE_PREFIX: &str = "archive-";

/// Metadata about a committed archive
#[derive(Debug, Clone)]
pub struct ArchiveInfo {
    /// Folder name
    pub name: String,
    /// Full path to the archive folder
    pub path: PathBuf,
    pub created_at: DateTime<Utc>,
    pub schema_version: u32,
    /// Total size of every artifact in bytes
    pub size_bytes: u64,
}

/// The archives kept in one backup directory
pub struct ArchiveCatalog {
    dir: PathBuf,
    retention: BackupRetention,
}

impl ArchiveCatalog {
    pub fn new(dir: PathBuf, retention: BackupRetention) -> Self {
        Self { dir, retention }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// All committed archives, newest first
    pub fn list(&self) -> BackupResult<Vec<ArchiveInfo>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let entries = fs::read_dir(&self.dir).map_err(|e| {
            BackupError::Io(format!("Failed to read backup directory: {}", e))
        })?;

        let mut archives = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| {
                BackupError::Io(format!("Failed to read directory entry: {}", e))
            })?;

            let path = entry.path();
            if path.is_dir() {
                match archive_info(&path) {
                    Some(info) => archives.push(info),
                    None => debug!(path = %path.display(), "Skipping folder without a valid descriptor"),
                }
            }
        }

        // Sort by date, newest first
        archives.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.name.cmp(&a.name))
        });

        Ok(archives)
    }

    /// Get the most recent archive
    pub fn latest(&self) -> BackupResult<Option<ArchiveInfo>> {
        Ok(self.list()?.into_iter().next())
    }

    /// A fresh, unused folder path for the next archive
    pub fn next_archive_path(&self) -> PathBuf {
        let now = Utc::now();
        let stem = format!(
            "{}{}-{:03}",
            ARCHIVE_PREFIX,
            now.format("%Y%m%d-%H%M%S"),
            now.timestamp_subsec_millis()
        );

        let mut path = self.dir.join(&stem);
        let mut attempt = 1;
        while path.exists() {
            path = self.dir.join(format!("{}-{}", stem, attempt));
            attempt += 1;
        }
        path
    }

    /// Resolve `latest`, an archive name in the backup directory, or a path
    pub fn resolve(&self, identifier: &str) -> BackupResult<PathBuf> {
        if identifier == "latest" {
            return self
                .latest()?
                .map(|info| info.path)
                .ok_or_else(|| BackupError::archive_not_found("latest"));
        }

        let named = self.dir.join(identifier);
        if named.is_dir() {
            return Ok(named);
        }

        let path = PathBuf::from(identifier);
        if path.is_dir() {
            return Ok(path);
        }

        Err(BackupError::archive_not_found(identifier))
    }

    /// Catalog-named folders with no descriptor, left by failed backups
    ///
    /// Folders with any other name are never considered, even when they hold
    /// no descriptor.
    pub fn stale_folders(&self) -> BackupResult<Vec<PathBuf>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let entries = fs::read_dir(&self.dir).map_err(|e| {
            BackupError::Io(format!("Failed to read backup directory: {}", e))
        })?;

        let mut stale = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| {
                BackupError::Io(format!("Failed to read directory entry: {}", e))
            })?;

            let path = entry.path();
            let ours = entry
                .file_name()
                .to_string_lossy()
                .starts_with(ARCHIVE_PREFIX);
            if ours && path.is_dir() && !Descriptor::path(&path).exists() {
                stale.push(path);
            }
        }

        stale.sort();
        Ok(stale)
    }

    /// Delete the oldest archives beyond the retention count, then any
    /// stale folders
    pub fn enforce_retention(&self) -> BackupResult<Vec<PathBuf>> {
        let archives = self.list()?;
        let mut deleted = Vec::new();

        for archive in archives.into_iter().skip(self.retention.keep_count as usize) {
            fs::remove_dir_all(&archive.path).map_err(|e| {
                BackupError::Io(format!(
                    "Failed to delete old archive {}: {}",
                    archive.name, e
                ))
            })?;
            info!(archive = %archive.name, "Pruned archive");
            deleted.push(archive.path);
        }

        for folder in self.stale_folders()? {
            fs::remove_dir_all(&folder).map_err(|e| {
                BackupError::Io(format!(
                    "Failed to delete incomplete archive {}: {}",
                    folder.display(),
                    e
                ))
            })?;
            info!(folder = %folder.display(), "Removed incomplete archive");
            deleted.push(folder);
        }

        Ok(deleted)
    }
}

fn archive_info(path: &Path) -> Option<ArchiveInfo> {
    let descriptor = Descriptor::read(path).ok()?;
    let created_at = descriptor.created_at()?;

    let size_bytes = fs::read_dir(path)
        .ok()?
        .filter_map(Result::ok)
        .filter_map(|entry| entry.metadata().ok())
        .filter(|metadata| metadata.is_file())
        .map(|metadata| metadata.len())
        .sum();

    Some(ArchiveInfo {
        name: path.file_name()?.to_string_lossy().to_string(),
        path: path.to_path_buf(),
        created_at,
        schema_version: descriptor.schema_version,
        size_bytes,
    })
}

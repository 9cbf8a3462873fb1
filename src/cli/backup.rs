//! Archive CLI commands
//!
//! Implements CLI commands for creating, restoring, inspecting and pruning
//! archives.

use clap::Subcommand;
use std::path::PathBuf;

use crate::archive::Descriptor;
use crate::backup::{ArchiveCatalog, BackupManager};
use crate::config::paths::StatePaths;
use crate::config::settings::Settings;
use crate::error::BackupResult;
use crate::storage::Storage;

/// Archive subcommands
#[derive(Subcommand)]
pub enum ArchiveCommands {
    /// Create a new archive
    Backup {
        /// Archive folder to create (defaults to a new folder in the backup directory)
        #[arg(short, long)]
        dest: Option<PathBuf>,
    },

    /// Restore from an archive
    Restore {
        /// Archive name or path (use 'latest' for most recent)
        archive: String,

        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Validate an archive without restoring it
    Inspect {
        /// Archive name or path (use 'latest' for most recent)
        archive: String,
    },

    /// List all available archives
    List {
        /// Show detailed information
        #[arg(short, long)]
        verbose: bool,
    },

    /// Delete old archives according to retention policy
    Prune {
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
}

/// Handle an archive command
pub fn handle_archive_command(
    paths: &StatePaths,
    settings: &Settings,
    cmd: ArchiveCommands,
) -> BackupResult<()> {
    let catalog = ArchiveCatalog::new(paths.backup_dir(), settings.retention.clone());

    match cmd {
        ArchiveCommands::Backup { dest } => {
            let mut manager = open_manager(paths, settings)?;
            let rotate = dest.is_none();
            let target = dest.unwrap_or_else(|| catalog.next_archive_path());

            println!("Creating archive...");
            manager.prepare_for_backup(&target)?;
            let report = manager.backup()?;

            println!("Archive created: {}", report.archive.display());
            println!("{}", report.summary());
            for failure in report.failures() {
                println!("  warning: {}", failure);
            }

            if rotate {
                let deleted = catalog.enforce_retention()?;
                if !deleted.is_empty() {
                    println!("Pruned {} old archive(s).", deleted.len());
                }
            }
        }

        ArchiveCommands::Restore { archive, force } => {
            let source = catalog.resolve(&archive)?;
            let mut manager = open_manager(paths, settings)?;

            // Validate the archive first
            let descriptor = manager.prepare_for_restore(&source)?;

            println!("Archive Information");
            println!("===================");
            println!("Folder: {}", source.display());
            println!("Created: {}", format_created(&descriptor));
            println!("Schema version: {}", descriptor.schema_version);
            println!();

            if !force {
                manager.cancel();
                println!("WARNING: This will overwrite ALL current data!");
                println!("To proceed, run again with --force flag:");
                println!("  statepack restore {} --force", archive);
                return Ok(());
            }

            // Snapshot current state before overwriting it
            println!("Creating archive of current data before restore...");
            let safety = catalog.next_archive_path();
            manager.prepare_for_backup(&safety)?;
            let safety_report = manager.backup()?;
            println!("Pre-restore archive saved: {}", safety_report.archive.display());
            println!();

            println!("Restoring from archive...");
            let report = manager.restore()?;

            println!("Restore complete!");
            println!("{}", report.summary());
            for failure in report.failures() {
                println!("  warning: {}", failure);
            }
            if report.migrated() {
                println!(
                    "\nArchive was written with schema v{} and has been upgraded.",
                    descriptor.schema_version
                );
            }
        }

        ArchiveCommands::Inspect { archive } => {
            let source = catalog.resolve(&archive)?;
            let summary = open_manager(paths, settings)?.inspect(&source)?;

            println!("Archive Details");
            println!("===============");
            println!("Folder: {}", source.display());
            println!("Created: {}", format_created(&summary.descriptor));
            println!("Schema version: {}", summary.descriptor.schema_version);
            println!();
            println!("Units:");
            for unit in &summary.units {
                match &unit.result {
                    Ok(header) => println!(
                        "  {:<20} {:<12} {:>6} entities  {}",
                        unit.key,
                        header.encoding.tag(),
                        header.entity_count,
                        format_size(header.size_bytes)
                    ),
                    Err(e) => println!("  {:<20} CORRUPT: {}", unit.key, e),
                }
            }
            for key in &summary.missing {
                println!("  {:<20} MISSING", key);
            }
            println!();
            println!(
                "Status: {}",
                if summary.is_valid() { "Valid" } else { "Invalid" }
            );
        }

        ArchiveCommands::List { verbose } => {
            let archives = catalog.list()?;

            if archives.is_empty() {
                println!("No archives found.");
                println!("Create one with: statepack backup");
                return Ok(());
            }

            println!("Available Archives");
            println!("==================");
            println!();

            for (i, archive) in archives.iter().enumerate() {
                let age = chrono::Utc::now().signed_duration_since(archive.created_at);
                let age_str = format_duration(age);

                if verbose {
                    println!(
                        "{}. {}\n   Created: {}\n   Schema: v{}\n   Size: {}\n   Age: {}\n",
                        i + 1,
                        archive.name,
                        archive.created_at.format("%Y-%m-%d %H:%M:%S UTC"),
                        archive.schema_version,
                        format_size(archive.size_bytes),
                        age_str,
                    );
                } else {
                    println!(
                        "  {}. {} ({} ago, {})",
                        i + 1,
                        archive.name,
                        age_str,
                        format_size(archive.size_bytes),
                    );
                }
            }

            println!();
            println!("Total: {} archive(s)", archives.len());
        }

        ArchiveCommands::Prune { force } => {
            let archives = catalog.list()?;
            let stale = catalog.stale_folders()?;
            let keep = settings.retention.keep_count as usize;
            let to_delete = archives.len().saturating_sub(keep);

            if to_delete == 0 && stale.is_empty() {
                println!("No archives to prune.");
                println!("Current retention policy: keep {}", keep);
                println!("You have {} archive(s).", archives.len());
                return Ok(());
            }

            println!("Prune Summary");
            println!("=============");
            println!("Retention policy: keep {}", keep);
            println!("Current archives: {}", archives.len());
            println!("To be deleted: {}", to_delete);
            if !stale.is_empty() {
                println!("Incomplete archives: {}", stale.len());
            }
            println!();

            if !force {
                println!("To delete old archives, run again with --force flag:");
                println!("  statepack prune --force");
                return Ok(());
            }

            let deleted = catalog.enforce_retention()?;
            println!("Deleted {} archive(s).", deleted.len());
        }
    }

    Ok(())
}

/// Build a manager over the on-disk host state
fn open_manager(paths: &StatePaths, settings: &Settings) -> BackupResult<BackupManager> {
    let mut storage = Storage::new(paths, settings)?;
    storage.load_all()?;
    Ok(BackupManager::from_settings(storage.into_host(), settings))
}

fn format_created(descriptor: &Descriptor) -> String {
    descriptor
        .created_at()
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Format a duration in human-readable form
fn format_duration(duration: chrono::Duration) -> String {
    let total_seconds = duration.num_seconds();

    if total_seconds < 60 {
        return format!("{}s", total_seconds);
    }

    let minutes = total_seconds / 60;
    if minutes < 60 {
        return format!("{}m", minutes);
    }

    let hours = minutes / 60;
    if hours < 24 {
        return format!("{}h", hours);
    }

    let days = hours / 24;
    if days < 30 {
        return format!("{}d", days);
    }

    format!("{}mo", days / 30)
}

/// Format a file size in human-readable form
fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

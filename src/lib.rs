//! statepack - versioned backup and restore of application state
//!
//! This library captures an application's persisted state (flat preferences,
//! row-oriented databases and account credentials) into a self-describing
//! archive folder, and reconstructs that state on the same or a newer
//! version.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - `archive`: On-disk archive format (descriptor, data units, reader, writer)
//! - `backup`: Backup engine (agent, manager, catalog, migrations)
//! - `host`: Interfaces to the state being backed up, plus in-memory stores
//! - `storage`: JSON file-backed host stores
//! - `models`: Accounts, preferences and database dumps
//! - `config`: Configuration and path management
//! - `error`: Custom error types
//! - `logging`: tracing subscriber setup
//! - `cli`: Command handlers for the `statepack` binary
//!
//! # Example
//!
//! ```rust,ignore
//! use statepack::backup::BackupManager;
//! use statepack::config::{paths::StatePaths, settings::Settings};
//! use statepack::storage::Storage;
//!
//! let paths = StatePaths::new()?;
//! let settings = Settings::load_or_create(&paths)?;
//! let mut storage = Storage::new(&paths, &settings)?;
//! storage.load_all()?;
//!
//! let mut manager = BackupManager::from_settings(storage.into_host(), &settings);
//! manager.prepare_for_backup(&target)?;
//! println!("{}", manager.backup()?.summary());
//! ```

pub mod archive;
pub mod backup;
pub mod cli;
pub mod config;
pub mod error;
pub mod host;
pub mod logging;
pub mod models;
pub mod storage;

pub use error::{BackupError, BackupResult};

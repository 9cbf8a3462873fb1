//! Configuration module for statepack
//!
//! This module provides configuration management including:
//! - XDG-compliant path resolution
//! - User settings persistence

pub mod paths;
pub mod settings;

pub use paths::StatePaths;
pub use settings::{BackupRetention, FailurePolicy, Settings};

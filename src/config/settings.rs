//! User settings for statepack
//!
//! Manages which databases the host exposes, how strictly partial failures
//! are judged, archive retention, and the log level.

use serde::{Deserialize, Serialize};

use super::paths::StatePaths;
use crate::error::BackupError;

/// How per-unit failures affect the overall outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Preferences and accounts must succeed; database failures are warnings
    #[default]
    Partial,
    /// Any failed unit fails the operation
    AllOrNothing,
}

/// Archive retention settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupRetention {
    /// Number of archives to keep in the backup directory
    pub keep_count: u32,
}

impl Default for BackupRetention {
    fn default() -> Self {
        Self { keep_count: 10 }
    }
}

/// User settings for statepack
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Names of the host databases to back up
    #[serde(default = "default_databases")]
    pub databases: Vec<String>,

    /// Refuse to back up into a non-empty folder
    #[serde(default = "default_require_empty_destination")]
    pub require_empty_destination: bool,

    /// Partial-failure policy for backup and restore
    #[serde(default)]
    pub failure_policy: FailurePolicy,

    /// Archive retention policy
    #[serde(default)]
    pub retention: BackupRetention,

    /// Log filter used when RUST_LOG is not set
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_databases() -> Vec<String> {
    vec!["main".to_string()]
}

fn default_require_empty_destination() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            databases: default_databases(),
            require_empty_destination: default_require_empty_destination(),
            failure_policy: FailurePolicy::default(),
            retention: BackupRetention::default(),
            log_level: default_log_level(),
        }
    }
}

impl Settings {
    /// Load settings from disk, or use defaults if the file doesn't exist
    pub fn load_or_create(paths: &StatePaths) -> Result<Self, BackupError> {
        let settings_path = paths.settings_file();

        if settings_path.exists() {
            let contents = std::fs::read_to_string(&settings_path).map_err(|e| {
                BackupError::Io(format!("Failed to read settings file: {}", e))
            })?;

            let settings: Settings = serde_json::from_str(&contents).map_err(|e| {
                BackupError::Config(format!("Failed to parse settings file: {}", e))
            })?;

            settings.validate()?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Database names must be usable as archive keys and unique
    pub fn validate(&self) -> Result<(), BackupError> {
        let mut seen = std::collections::HashSet::new();
        for name in &self.databases {
            crate::archive::validate_key(name).map_err(|_| {
                BackupError::Config(format!(
                    "Database name '{}' must be lowercase letters, digits or underscores",
                    name
                ))
            })?;
            if crate::backup::RESERVED_KEYS.contains(&name.as_str()) {
                return Err(BackupError::Config(format!(
                    "Database name '{}' is reserved",
                    name
                )));
            }
            if !seen.insert(name.as_str()) {
                return Err(BackupError::Config(format!(
                    "Database '{}' is listed twice",
                    name
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.databases, vec!["main".to_string()]);
        assert!(settings.require_empty_destination);
        assert_eq!(settings.failure_policy, FailurePolicy::Partial);
        assert_eq!(settings.retention.keep_count, 10);
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let paths = StatePaths::with_base_dir(temp_dir.path().to_path_buf());
        std::fs::write(
            paths.settings_file(),
            r#"{"databases": ["mail", "contacts"], "failure_policy": "all_or_nothing"}"#,
        )
        .unwrap();

        let loaded = Settings::load_or_create(&paths).unwrap();
        assert_eq!(loaded.databases, vec!["mail".to_string(), "contacts".to_string()]);
        assert_eq!(loaded.failure_policy, FailurePolicy::AllOrNothing);
        assert!(loaded.require_empty_destination);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let paths = StatePaths::with_base_dir(temp_dir.path().to_path_buf());
        let loaded = Settings::load_or_create(&paths).unwrap();
        assert_eq!(loaded.databases, vec!["main".to_string()]);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let paths = StatePaths::with_base_dir(temp_dir.path().to_path_buf());
        std::fs::write(paths.settings_file(), r#"{"failure_policy": "all_or_nothing"}"#).unwrap();

        let loaded = Settings::load_or_create(&paths).unwrap();
        assert_eq!(loaded.failure_policy, FailurePolicy::AllOrNothing);
        assert_eq!(loaded.log_level, "info");
    }

    #[test]
    fn test_invalid_database_name() {
        let mut settings = Settings::default();
        settings.databases = vec!["Mail DB".into()];
        assert!(matches!(settings.validate(), Err(BackupError::Config(_))));

        settings.databases = vec!["mail".into(), "mail".into()];
        assert!(settings.validate().is_err());

        settings.databases = vec!["preferences".into()];
        assert!(settings.validate().is_err());
    }
}

//! Table database for JSON storage
//!
//! A small row-oriented database kept in `databases/<name>.json`. Tables are
//! named; each holds a list of JSON object rows.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use serde_json::{Map, Value};

use crate::error::BackupError;
use crate::host::DatabaseHandle;
use crate::models::{DatabaseDump, TableRow};

use super::file_io::{read_json, write_json_atomic};

type Tables = BTreeMap<String, Vec<Map<String, Value>>>;

/// Serializable database file structure
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
struct DatabaseData {
    tables: Tables,
}

/// File-backed table database
pub struct TableDatabase {
    name: String,
    path: PathBuf,
    tables: RwLock<Tables>,
    open: AtomicBool,
}

impl TableDatabase {
    /// Create a handle for the database stored at `path`
    pub fn new(name: impl Into<String>, path: PathBuf) -> Self {
        Self {
            name: name.into(),
            path,
            tables: RwLock::new(Tables::new()),
            open: AtomicBool::new(false),
        }
    }

    fn save(&self) -> Result<(), BackupError> {
        let tables = self.tables.read().map_err(|e| {
            BackupError::Storage(format!("Failed to acquire read lock: {}", e))
        })?;

        write_json_atomic(
            &self.path,
            &DatabaseData {
                tables: tables.clone(),
            },
        )
    }

    fn ensure_open(&self) -> Result<(), BackupError> {
        if self.open.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(BackupError::Storage(format!(
                "Database '{}' is not open",
                self.name
            )))
        }
    }
}

impl DatabaseHandle for TableDatabase {
    fn name(&self) -> &str {
        &self.name
    }

    fn open(&self) -> Result<(), BackupError> {
        let file_data: DatabaseData = read_json(&self.path)?;

        let mut tables = self.tables.write().map_err(|e| {
            BackupError::Storage(format!("Failed to acquire write lock: {}", e))
        })?;
        *tables = file_data.tables;

        self.open.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn close(&self) -> Result<(), BackupError> {
        self.open.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn dump(&self) -> Result<DatabaseDump, BackupError> {
        self.ensure_open()?;

        let tables = self.tables.read().map_err(|e| {
            BackupError::Storage(format!("Failed to acquire read lock: {}", e))
        })?;

        let rows = tables
            .iter()
            .flat_map(|(table, rows)| {
                rows.iter()
                    .map(move |values| TableRow::new(table.clone(), values.clone()))
            })
            .collect();

        Ok(DatabaseDump::Rows(rows))
    }

    fn load(&self, dump: DatabaseDump) -> Result<(), BackupError> {
        self.ensure_open()?;

        let rows = match dump {
            DatabaseDump::Rows(rows) => rows,
            DatabaseDump::Raw(_) => {
                return Err(BackupError::Storage(format!(
                    "Database '{}' cannot load a raw image",
                    self.name
                )))
            }
        };

        {
            let mut tables = self.tables.write().map_err(|e| {
                BackupError::Storage(format!("Failed to acquire write lock: {}", e))
            })?;

            // Keep known tables, drop their rows
            for existing in tables.values_mut() {
                existing.clear();
            }
            for row in rows {
                tables.entry(row.table).or_default().push(row.values);
            }
        }

        self.save()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn row(id: i64) -> Map<String, Value> {
        let mut values = Map::new();
        values.insert("id".into(), json!(id));
        values
    }

    #[test]
    fn test_dump_requires_open() {
        let temp_dir = TempDir::new().unwrap();
        let db = TableDatabase::new("mail", temp_dir.path().join("mail.json"));
        assert!(db.dump().is_err());
    }

    #[test]
    fn test_dump_flattens_tables() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("mail.json");
        std::fs::write(
            &path,
            r#"{"tables": {"messages": [{"id": 1}, {"id": 3}], "folders": [{"id": 2}]}}"#,
        )
        .unwrap();

        let db = TableDatabase::new("mail", path);
        db.open().unwrap();
        let DatabaseDump::Rows(rows) = db.dump().unwrap() else {
            panic!("expected rows");
        };
        let tables: Vec<_> = rows.iter().map(|r| r.table.as_str()).collect();
        assert_eq!(tables, vec!["folders", "messages", "messages"]);
        assert_eq!(rows[2].values, row(3));
    }

    #[test]
    fn test_load_replaces_rows_and_persists() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("mail.json");
        std::fs::write(
            &path,
            r#"{"tables": {"messages": [{"id": 1}], "drafts": []}}"#,
        )
        .unwrap();

        let db = TableDatabase::new("mail", path.clone());
        db.open().unwrap();
        db.load(DatabaseDump::Rows(vec![TableRow::new("messages", row(9))]))
            .unwrap();
        db.close().unwrap();

        let on_disk: Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(on_disk["tables"]["messages"], json!([{"id": 9}]));
        // Known tables survive with no rows
        assert_eq!(on_disk["tables"]["drafts"], json!([]));
    }

    #[test]
    fn test_load_rejects_raw_image() {
        let temp_dir = TempDir::new().unwrap();
        let db = TableDatabase::new("mail", temp_dir.path().join("mail.json"));
        db.open().unwrap();
        assert!(db.load(DatabaseDump::Raw(vec![1, 2])).is_err());
    }
}

//! Database dump model
//!
//! A database handle dumps its contents either as portable rows or as an
//! opaque byte image.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One row of one table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRow {
    pub table: String,
    pub values: Map<String, Value>,
}

impl TableRow {
    pub fn new(table: impl Into<String>, values: Map<String, Value>) -> Self {
        Self {
            table: table.into(),
            values,
        }
    }
}

/// Full contents of one database
#[derive(Debug, Clone, PartialEq)]
pub enum DatabaseDump {
    /// Every row of every table, in table order
    Rows(Vec<TableRow>),
    /// Opaque image in the handle's own format
    Raw(Vec<u8>),
}

impl DatabaseDump {
    /// Number of rows, or 1 for an opaque image
    pub fn entity_count(&self) -> usize {
        match self {
            Self::Rows(rows) => rows.len(),
            Self::Raw(_) => 1,
        }
    }
}

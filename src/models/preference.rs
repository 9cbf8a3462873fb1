//! Preference values
//!
//! Flat key/value settings as kept by the host's preference store.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A single preference value
///
/// Serialized untagged, so a preference set maps directly onto a JSON object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PreferenceValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    TextSet(Vec<String>),
}

/// A full preference set, ordered by key
pub type Preferences = BTreeMap<String, PreferenceValue>;

impl From<bool> for PreferenceValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for PreferenceValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for PreferenceValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for PreferenceValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for PreferenceValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Vec<String>> for PreferenceValue {
    fn from(value: Vec<String>) -> Self {
        Self::TextSet(value)
    }
}

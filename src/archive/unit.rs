//! Data units: named, typed, sized blocks of archived content
//!
//! Every unit is stored as two artifacts: `<key>_header`, a small JSON
//! record describing the payload, and `<key>_data<ext>`, the payload itself.
//! Keeping the header separate lets a reader validate size expectations
//! before materializing a potentially large payload.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{BackupError, BackupResult};

/// Suffix of header artifacts
pub const HEADER_SUFFIX: &str = "_header";

/// Suffix of payload artifacts, followed by the encoding's file extension
pub const DATA_SUFFIX: &str = "_data";

const MAX_KEY_LEN: usize = 128;

/// How a unit's payload is encoded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Encoding {
    /// Opaque bytes, stored verbatim
    RawBytes,
    /// A single JSON object
    JsonObject,
    /// A JSON array; each element is one entity
    JsonArray,
}

impl Encoding {
    /// Tag written to the header's `encoding` field
    pub fn tag(&self) -> &'static str {
        match self {
            Self::RawBytes => "raw_bytes",
            Self::JsonObject => "json_object",
            Self::JsonArray => "json_array",
        }
    }

    /// Parse a header tag
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "raw_bytes" => Some(Self::RawBytes),
            "json_object" => Some(Self::JsonObject),
            "json_array" => Some(Self::JsonArray),
            _ => None,
        }
    }

    /// Extension of the payload artifact, including the leading dot
    pub fn file_extension(&self) -> &'static str {
        match self {
            Self::RawBytes => ".bin",
            Self::JsonObject | Self::JsonArray => ".json",
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Payload of a data unit; the variant determines the encoding
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Raw(Vec<u8>),
    Object(Map<String, Value>),
    Array(Vec<Value>),
}

impl Payload {
    /// Encoding tag for this payload
    pub fn encoding(&self) -> Encoding {
        match self {
            Self::Raw(_) => Encoding::RawBytes,
            Self::Object(_) => Encoding::JsonObject,
            Self::Array(_) => Encoding::JsonArray,
        }
    }

    /// Number of entities: array length for arrays, 1 otherwise
    pub fn entity_count(&self) -> u64 {
        match self {
            Self::Array(items) => items.len() as u64,
            Self::Raw(_) | Self::Object(_) => 1,
        }
    }

    /// Serialize to the exact bytes persisted in the payload artifact
    ///
    /// JSON is written compact with sorted object keys, so identical state
    /// always produces identical bytes.
    pub fn to_bytes(&self) -> BackupResult<Vec<u8>> {
        let bytes = match self {
            Self::Raw(bytes) => bytes.clone(),
            Self::Object(map) => serde_json::to_vec(map)?,
            Self::Array(items) => serde_json::to_vec(items)?,
        };
        Ok(bytes)
    }

    /// Decode payload bytes read from an archive
    pub fn decode(key: &str, encoding: Encoding, bytes: Vec<u8>) -> BackupResult<Self> {
        match encoding {
            Encoding::RawBytes => Ok(Self::Raw(bytes)),
            Encoding::JsonObject => match parse_json(key, &bytes)? {
                Value::Object(map) => Ok(Self::Object(map)),
                other => Err(BackupError::Format(format!(
                    "Payload of '{}' is {} but header declares json_object",
                    key,
                    json_kind(&other)
                ))),
            },
            Encoding::JsonArray => match parse_json(key, &bytes)? {
                Value::Array(items) => Ok(Self::Array(items)),
                other => Err(BackupError::Format(format!(
                    "Payload of '{}' is {} but header declares json_array",
                    key,
                    json_kind(&other)
                ))),
            },
        }
    }

    /// Take the object out of a json_object payload
    pub fn into_object(self, key: &str) -> BackupResult<Map<String, Value>> {
        match self {
            Self::Object(map) => Ok(map),
            other => Err(unexpected_encoding(key, Encoding::JsonObject, other.encoding())),
        }
    }

    /// Take the elements out of a json_array payload
    pub fn into_array(self, key: &str) -> BackupResult<Vec<Value>> {
        match self {
            Self::Array(items) => Ok(items),
            other => Err(unexpected_encoding(key, Encoding::JsonArray, other.encoding())),
        }
    }
}

/// Header describing a unit's payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitHeader {
    pub key: String,
    pub size_bytes: u64,
    pub entity_count: u64,
    pub encoding: Encoding,
}

/// On-disk shape of a header artifact
#[derive(Debug, Serialize, Deserialize)]
struct HeaderRecord {
    data_size: u64,
    file_extension: String,
    encoding: String,
    entity_count: u64,
}

impl UnitHeader {
    /// Name of the header artifact
    pub fn header_file_name(key: &str) -> String {
        format!("{}{}", key, HEADER_SUFFIX)
    }

    /// Name of the payload artifact
    pub fn data_file_name(key: &str, encoding: Encoding) -> String {
        format!("{}{}{}", key, DATA_SUFFIX, encoding.file_extension())
    }

    /// Serialize to header artifact bytes
    pub fn to_bytes(&self) -> BackupResult<Vec<u8>> {
        let record = HeaderRecord {
            data_size: self.size_bytes,
            file_extension: self.encoding.file_extension().to_string(),
            encoding: self.encoding.tag().to_string(),
            entity_count: self.entity_count,
        };
        Ok(serde_json::to_vec_pretty(&record)?)
    }

    /// Parse header artifact bytes for `key`
    pub fn parse(key: &str, bytes: &[u8]) -> BackupResult<Self> {
        let record: HeaderRecord = serde_json::from_slice(bytes).map_err(|e| {
            BackupError::Format(format!("Malformed header for '{}': {}", key, e))
        })?;

        let encoding =
            Encoding::from_tag(&record.encoding).ok_or_else(|| BackupError::UnknownEncoding {
                key: key.to_string(),
                tag: record.encoding.clone(),
            })?;

        if record.file_extension != encoding.file_extension() {
            return Err(BackupError::Format(format!(
                "Header for '{}' declares extension '{}' but encoding {} uses '{}'",
                key,
                record.file_extension,
                encoding,
                encoding.file_extension()
            )));
        }

        Ok(Self {
            key: key.to_string(),
            size_bytes: record.data_size,
            entity_count: record.entity_count,
            encoding,
        })
    }
}

/// A fully materialized data unit
#[derive(Debug, Clone, PartialEq)]
pub struct DataUnit {
    pub key: String,
    pub size_bytes: u64,
    pub entity_count: u64,
    pub encoding: Encoding,
    pub payload: Payload,
}

impl DataUnit {
    /// Header fields of this unit
    pub fn header(&self) -> UnitHeader {
        UnitHeader {
            key: self.key.clone(),
            size_bytes: self.size_bytes,
            entity_count: self.entity_count,
            encoding: self.encoding,
        }
    }
}

/// Check that `key` can safely name archive artifacts
///
/// Keys are lowercase ASCII letters, digits and underscores.
pub fn validate_key(key: &str) -> BackupResult<()> {
    let valid = !key.is_empty()
        && key.len() <= MAX_KEY_LEN
        && key
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_');

    if valid {
        Ok(())
    } else {
        Err(BackupError::InvalidKey(key.to_string()))
    }
}

fn parse_json(key: &str, bytes: &[u8]) -> BackupResult<Value> {
    serde_json::from_slice(bytes)
        .map_err(|e| BackupError::Format(format!("Malformed payload for '{}': {}", key, e)))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn unexpected_encoding(key: &str, wanted: Encoding, found: Encoding) -> BackupError {
    BackupError::Format(format!(
        "Unit '{}' is encoded as {} but {} was expected",
        key, found, wanted
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_entity_count() {
        assert_eq!(Payload::Raw(vec![1, 2, 3]).entity_count(), 1);
        assert_eq!(Payload::Object(Map::new()).entity_count(), 1);
        assert_eq!(Payload::Array(vec![]).entity_count(), 0);
        assert_eq!(Payload::Array(vec![json!(1), json!(2)]).entity_count(), 2);
    }

    #[test]
    fn test_object_bytes_are_key_sorted() {
        let mut map = Map::new();
        map.insert("zeta".into(), json!(1));
        map.insert("alpha".into(), json!(true));

        let bytes = Payload::Object(map).to_bytes().unwrap();
        assert_eq!(bytes, br#"{"alpha":true,"zeta":1}"#.to_vec());
    }

    #[test]
    fn test_artifact_names() {
        assert_eq!(UnitHeader::header_file_name("preferences"), "preferences_header");
        assert_eq!(
            UnitHeader::data_file_name("preferences", Encoding::JsonObject),
            "preferences_data.json"
        );
        assert_eq!(
            UnitHeader::data_file_name("mail", Encoding::RawBytes),
            "mail_data.bin"
        );
    }

    #[test]
    fn test_header_fields_on_disk() {
        let header = UnitHeader {
            key: "account_data".into(),
            size_bytes: 42,
            entity_count: 3,
            encoding: Encoding::JsonArray,
        };

        let value: Value = serde_json::from_slice(&header.to_bytes().unwrap()).unwrap();
        assert_eq!(value["data_size"], json!(42));
        assert_eq!(value["file_extension"], json!(".json"));
        assert_eq!(value["encoding"], json!("json_array"));
        assert_eq!(value["entity_count"], json!(3));

        let parsed = UnitHeader::parse("account_data", &header.to_bytes().unwrap()).unwrap();
        assert_eq!(parsed, header);
    }

    #[test]
    fn test_unknown_encoding_tag() {
        let bytes = br#"{"data_size":1,"file_extension":".json","encoding":"yaml","entity_count":1}"#;
        let err = UnitHeader::parse("preferences", bytes).unwrap_err();
        assert!(matches!(err, BackupError::UnknownEncoding { ref tag, .. } if tag == "yaml"));
    }

    #[test]
    fn test_malformed_header() {
        let err = UnitHeader::parse("preferences", b"{\"data_size\": 3}").unwrap_err();
        assert!(matches!(err, BackupError::Format(_)));
    }

    #[test]
    fn test_extension_must_match_encoding() {
        let bytes = br#"{"data_size":1,"file_extension":".bin","encoding":"json_object","entity_count":1}"#;
        let err = UnitHeader::parse("preferences", bytes).unwrap_err();
        assert!(matches!(err, BackupError::Format(_)));
    }

    #[test]
    fn test_decode_rejects_wrong_shape() {
        let err = Payload::decode("preferences", Encoding::JsonObject, b"[1,2]".to_vec()).unwrap_err();
        assert!(matches!(err, BackupError::Format(_)));

        let payload = Payload::decode("rows", Encoding::JsonArray, b"[1,2]".to_vec()).unwrap();
        assert_eq!(payload.entity_count(), 2);
    }

    #[test]
    fn test_validate_key() {
        assert!(validate_key("preferences").is_ok());
        assert!(validate_key("account_data").is_ok());
        assert!(validate_key("mail2").is_ok());
        assert!(validate_key("").is_err());
        assert!(validate_key("Mail").is_err());
        assert!(validate_key("../escape").is_err());
        assert!(validate_key("with space").is_err());
    }
}

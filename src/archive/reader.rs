//! Data input reader
//!
//! Enumerates and retrieves data units from an archive folder, validating
//! each payload against its header.

use std::collections::BTreeSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::unit::{validate_key, DataUnit, Payload, UnitHeader, HEADER_SUFFIX};
use crate::error::{BackupError, BackupResult};

/// Reads data units from an archive folder
#[derive(Debug)]
pub struct DataInputReader {
    folder: PathBuf,
    closed: bool,
}

impl DataInputReader {
    /// Open a reader; nothing is parsed until a unit is requested
    pub fn open(folder: &Path) -> BackupResult<Self> {
        if !folder.is_dir() {
            return Err(BackupError::Io(format!(
                "Archive folder does not exist: {}",
                folder.display()
            )));
        }

        Ok(Self {
            folder: folder.to_path_buf(),
            closed: false,
        })
    }

    /// Keys of every unit header present in the folder
    pub fn list_keys(&self) -> BackupResult<BTreeSet<String>> {
        self.ensure_open()?;

        let entries = fs::read_dir(&self.folder).map_err(|e| {
            BackupError::Io(format!("Failed to read {}: {}", self.folder.display(), e))
        })?;

        let mut keys = BTreeSet::new();
        for entry in entries {
            let entry = entry
                .map_err(|e| BackupError::Io(format!("Failed to read directory entry: {}", e)))?;
            let name = entry.file_name();
            let name = name.to_string_lossy();

            if let Some(key) = name.strip_suffix(HEADER_SUFFIX) {
                if validate_key(key).is_ok() {
                    keys.insert(key.to_string());
                }
            }
        }

        Ok(keys)
    }

    /// Read and validate a unit's header without touching its payload
    pub fn read_header(&self, key: &str) -> BackupResult<UnitHeader> {
        self.ensure_open()?;
        validate_key(key)?;

        let path = self.folder.join(UnitHeader::header_file_name(key));
        let bytes = fs::read(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => BackupError::MissingUnit(key.to_string()),
            _ => BackupError::Io(format!("Failed to read {}: {}", path.display(), e)),
        })?;

        UnitHeader::parse(key, &bytes)
    }

    /// Read a full unit, checking payload length and shape against the header
    pub fn read_unit(&self, key: &str) -> BackupResult<DataUnit> {
        let header = self.read_header(key)?;

        let path = self
            .folder
            .join(UnitHeader::data_file_name(key, header.encoding));
        let payload_error = |e: std::io::Error| match e.kind() {
            ErrorKind::NotFound => {
                BackupError::Format(format!("Payload artifact missing for '{}'", key))
            }
            _ => BackupError::Io(format!("Failed to read {}: {}", path.display(), e)),
        };

        // Reject on the recorded length before loading anything
        let on_disk = fs::metadata(&path).map_err(payload_error)?.len();
        if on_disk != header.size_bytes {
            return Err(BackupError::size_mismatch(key, header.size_bytes, on_disk));
        }

        let bytes = fs::read(&path).map_err(payload_error)?;
        let actual = bytes.len() as u64;
        if actual != header.size_bytes {
            return Err(BackupError::size_mismatch(key, header.size_bytes, actual));
        }

        let payload = Payload::decode(key, header.encoding, bytes)?;
        if payload.entity_count() != header.entity_count {
            return Err(BackupError::Format(format!(
                "Unit '{}' holds {} entities but header declares {}",
                key,
                payload.entity_count(),
                header.entity_count
            )));
        }

        Ok(DataUnit {
            key: header.key,
            size_bytes: header.size_bytes,
            entity_count: header.entity_count,
            encoding: header.encoding,
            payload,
        })
    }

    /// Release the reader; safe to call twice
    pub fn close(&mut self) -> BackupResult<()> {
        self.closed = true;
        Ok(())
    }

    /// Folder this reader reads from
    pub fn folder(&self) -> &Path {
        &self.folder
    }

    fn ensure_open(&self) -> BackupResult<()> {
        if self.closed {
            Err(BackupError::Io("Reader is closed".into()))
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::unit::Encoding;
    use crate::archive::writer::DataOutputWriter;
    use serde_json::{json, Map};
    use tempfile::TempDir;

    fn write_sample(folder: &Path) {
        let mut writer = DataOutputWriter::open(folder).unwrap();
        let mut prefs = Map::new();
        prefs.insert("theme".into(), json!("dark"));
        writer.write_unit("preferences", &Payload::Object(prefs)).unwrap();
        writer
            .write_unit("mail", &Payload::Array(vec![json!({"id": 1})]))
            .unwrap();
        writer.close().unwrap();
    }

    #[test]
    fn test_open_missing_folder() {
        let temp = TempDir::new().unwrap();
        let err = DataInputReader::open(&temp.path().join("missing")).unwrap_err();
        assert!(matches!(err, BackupError::Io(_)));
    }

    #[test]
    fn test_list_keys() {
        let temp = TempDir::new().unwrap();
        write_sample(temp.path());
        fs::write(temp.path().join("descriptor"), "{}").unwrap();

        let reader = DataInputReader::open(temp.path()).unwrap();
        let keys: Vec<_> = reader.list_keys().unwrap().into_iter().collect();
        assert_eq!(keys, vec!["mail".to_string(), "preferences".to_string()]);
    }

    #[test]
    fn test_read_unit() {
        let temp = TempDir::new().unwrap();
        write_sample(temp.path());

        let reader = DataInputReader::open(temp.path()).unwrap();
        let unit = reader.read_unit("mail").unwrap();

        assert_eq!(unit.encoding, Encoding::JsonArray);
        assert_eq!(unit.entity_count, 1);
        let on_disk = fs::read(temp.path().join("mail_data.json")).unwrap();
        assert_eq!(unit.size_bytes, on_disk.len() as u64);
    }

    #[test]
    fn test_truncated_payload_is_size_mismatch() {
        let temp = TempDir::new().unwrap();
        write_sample(temp.path());

        let path = temp.path().join("preferences_data.json");
        let mut bytes = fs::read(&path).unwrap();
        bytes.pop();
        fs::write(&path, &bytes).unwrap();

        let reader = DataInputReader::open(temp.path()).unwrap();
        let err = reader.read_unit("preferences").unwrap_err();
        assert!(matches!(err, BackupError::SizeMismatch { ref key, .. } if key == "preferences"));

        // Sibling units are unaffected
        assert!(reader.read_unit("mail").is_ok());
    }

    #[test]
    fn test_oversized_payload_rejected_by_length() {
        let temp = TempDir::new().unwrap();
        write_sample(temp.path());

        // Header says a few bytes; the payload on disk is far larger and not JSON
        fs::write(temp.path().join("mail_data.json"), vec![b'x'; 64 * 1024]).unwrap();

        let reader = DataInputReader::open(temp.path()).unwrap();
        let err = reader.read_unit("mail").unwrap_err();
        assert!(matches!(
            err,
            BackupError::SizeMismatch { actual: 65536, .. }
        ));
    }

    #[test]
    fn test_missing_unit() {
        let temp = TempDir::new().unwrap();
        write_sample(temp.path());

        let reader = DataInputReader::open(temp.path()).unwrap();
        let err = reader.read_unit("account_data").unwrap_err();
        assert!(matches!(err, BackupError::MissingUnit(_)));
    }

    #[test]
    fn test_missing_payload_is_format_error() {
        let temp = TempDir::new().unwrap();
        write_sample(temp.path());
        fs::remove_file(temp.path().join("mail_data.json")).unwrap();

        let reader = DataInputReader::open(temp.path()).unwrap();
        assert!(matches!(
            reader.read_unit("mail"),
            Err(BackupError::Format(_))
        ));
    }

    #[test]
    fn test_entity_count_disagreement() {
        let temp = TempDir::new().unwrap();
        let payload = br#"[1,2]"#;
        fs::write(temp.path().join("rows_data.json"), payload).unwrap();
        fs::write(
            temp.path().join("rows_header"),
            r#"{"data_size":5,"file_extension":".json","encoding":"json_array","entity_count":3}"#,
        )
        .unwrap();

        let reader = DataInputReader::open(temp.path()).unwrap();
        assert!(matches!(
            reader.read_unit("rows"),
            Err(BackupError::Format(_))
        ));
    }

    #[test]
    fn test_read_after_close() {
        let temp = TempDir::new().unwrap();
        write_sample(temp.path());

        let mut reader = DataInputReader::open(temp.path()).unwrap();
        reader.close().unwrap();
        assert!(matches!(reader.list_keys(), Err(BackupError::Io(_))));
    }
}

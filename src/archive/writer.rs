//! Data output writer
//!
//! Persists data units into an archive folder as header + payload artifacts.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::descriptor::DESCRIPTOR_FILE;
use super::unit::{validate_key, Payload, UnitHeader, HEADER_SUFFIX};
use crate::error::{BackupError, BackupResult};
use crate::storage::file_io::write_bytes_atomic;

/// Writes data units into an archive folder
///
/// Each artifact is written atomically, payload first, so a header never
/// exists without its payload. The writer is closed on drop if the caller
/// did not close it explicitly.
#[derive(Debug)]
pub struct DataOutputWriter {
    folder: PathBuf,
    keys: HashSet<String>,
    units: Vec<UnitHeader>,
    closed: bool,
}

impl DataOutputWriter {
    /// Open a writer on an existing folder that holds no archive yet
    pub fn open(folder: &Path) -> BackupResult<Self> {
        if !folder.is_dir() {
            return Err(BackupError::Io(format!(
                "Archive folder does not exist: {}",
                folder.display()
            )));
        }

        if holds_archive_artifacts(folder)? {
            return Err(BackupError::Io(format!(
                "Archive folder already holds an archive: {}",
                folder.display()
            )));
        }

        Ok(Self {
            folder: folder.to_path_buf(),
            keys: HashSet::new(),
            units: Vec::new(),
            closed: false,
        })
    }

    /// Write one unit and return its header
    pub fn write_unit(&mut self, key: &str, payload: &Payload) -> BackupResult<UnitHeader> {
        if self.closed {
            return Err(BackupError::Io("Writer is closed".into()));
        }

        validate_key(key)?;

        if self.keys.contains(key) {
            return Err(BackupError::DuplicateKey(key.to_string()));
        }

        let bytes = payload
            .to_bytes()
            .map_err(|e| BackupError::Format(format!("Failed to encode '{}': {}", key, e)))?;

        let encoding = payload.encoding();
        let header = UnitHeader {
            key: key.to_string(),
            size_bytes: bytes.len() as u64,
            entity_count: payload.entity_count(),
            encoding,
        };

        let data_path = self.folder.join(UnitHeader::data_file_name(key, encoding));
        write_bytes_atomic(&data_path, &bytes).map_err(|e| {
            BackupError::Io(format!("Failed to write {}: {}", data_path.display(), e))
        })?;

        let header_path = self.folder.join(UnitHeader::header_file_name(key));
        write_bytes_atomic(&header_path, &header.to_bytes()?).map_err(|e| {
            BackupError::Io(format!("Failed to write {}: {}", header_path.display(), e))
        })?;

        debug!(
            key,
            size_bytes = header.size_bytes,
            entity_count = header.entity_count,
            encoding = %encoding,
            "Wrote data unit"
        );

        self.keys.insert(key.to_string());
        self.units.push(header.clone());
        Ok(header)
    }

    /// Flush the folder and release the writer; safe to call twice
    pub fn close(&mut self) -> BackupResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        sync_dir(&self.folder)
    }

    /// Headers written so far, in write order
    pub fn units(&self) -> &[UnitHeader] {
        &self.units
    }

    /// Total payload bytes written
    pub fn total_bytes(&self) -> u64 {
        self.units.iter().map(|u| u.size_bytes).sum()
    }

    /// Folder this writer targets
    pub fn folder(&self) -> &Path {
        &self.folder
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Drop for DataOutputWriter {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("Failed to close archive writer for {}: {}", self.folder.display(), e);
        }
    }
}

/// Whether `folder` contains a descriptor or any unit header
fn holds_archive_artifacts(folder: &Path) -> BackupResult<bool> {
    let entries = fs::read_dir(folder).map_err(|e| {
        BackupError::Io(format!("Failed to read {}: {}", folder.display(), e))
    })?;

    for entry in entries {
        let entry = entry
            .map_err(|e| BackupError::Io(format!("Failed to read directory entry: {}", e)))?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name == DESCRIPTOR_FILE || name.ends_with(HEADER_SUFFIX) {
            return Ok(true);
        }
    }

    Ok(false)
}

#[cfg(unix)]
fn sync_dir(folder: &Path) -> BackupResult<()> {
    fs::File::open(folder)
        .and_then(|dir| dir.sync_all())
        .map_err(|e| BackupError::Io(format!("Failed to sync {}: {}", folder.display(), e)))
}

#[cfg(not(unix))]
fn sync_dir(_folder: &Path) -> BackupResult<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map};
    use tempfile::TempDir;

    #[test]
    fn test_open_missing_folder() {
        let temp = TempDir::new().unwrap();
        let err = DataOutputWriter::open(&temp.path().join("missing")).unwrap_err();
        assert!(matches!(err, BackupError::Io(_)));
    }

    #[test]
    fn test_open_refuses_existing_archive() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("preferences_header"), "{}").unwrap();

        let err = DataOutputWriter::open(temp.path()).unwrap_err();
        assert!(matches!(err, BackupError::Io(_)));
    }

    #[test]
    fn test_open_reuses_folder_without_archive() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("notes.txt"), "unrelated").unwrap();

        assert!(DataOutputWriter::open(temp.path()).is_ok());
    }

    #[test]
    fn test_write_unit_artifacts() {
        let temp = TempDir::new().unwrap();
        let mut writer = DataOutputWriter::open(temp.path()).unwrap();

        let payload = Payload::Array(vec![json!({"id": 1}), json!({"id": 2})]);
        let header = writer.write_unit("mail", &payload).unwrap();
        writer.close().unwrap();

        assert_eq!(header.entity_count, 2);
        let data = fs::read(temp.path().join("mail_data.json")).unwrap();
        assert_eq!(data.len() as u64, header.size_bytes);
        assert!(temp.path().join("mail_header").exists());
        assert!(!temp.path().join("mail_data.json.tmp").exists());
    }

    #[test]
    fn test_raw_bytes_unit() {
        let temp = TempDir::new().unwrap();
        let mut writer = DataOutputWriter::open(temp.path()).unwrap();

        let header = writer
            .write_unit("blobs", &Payload::Raw(vec![0, 159, 146, 150]))
            .unwrap();

        assert_eq!(header.size_bytes, 4);
        assert_eq!(header.entity_count, 1);
        assert!(temp.path().join("blobs_data.bin").exists());
    }

    #[test]
    fn test_duplicate_key() {
        let temp = TempDir::new().unwrap();
        let mut writer = DataOutputWriter::open(temp.path()).unwrap();

        writer
            .write_unit("preferences", &Payload::Object(Map::new()))
            .unwrap();
        let err = writer
            .write_unit("preferences", &Payload::Object(Map::new()))
            .unwrap_err();

        assert!(matches!(err, BackupError::DuplicateKey(ref k) if k == "preferences"));
    }

    #[test]
    fn test_invalid_key() {
        let temp = TempDir::new().unwrap();
        let mut writer = DataOutputWriter::open(temp.path()).unwrap();

        let err = writer
            .write_unit("../outside", &Payload::Raw(Vec::new()))
            .unwrap_err();
        assert!(matches!(err, BackupError::InvalidKey(_)));
    }

    #[test]
    fn test_write_after_close() {
        let temp = TempDir::new().unwrap();
        let mut writer = DataOutputWriter::open(temp.path()).unwrap();
        writer.close().unwrap();
        writer.close().unwrap();

        let err = writer
            .write_unit("preferences", &Payload::Object(Map::new()))
            .unwrap_err();
        assert!(matches!(err, BackupError::Io(_)));
    }

    #[test]
    fn test_tracks_units_in_order() {
        let temp = TempDir::new().unwrap();
        let mut writer = DataOutputWriter::open(temp.path()).unwrap();

        writer.write_unit("b", &Payload::Raw(vec![1])).unwrap();
        writer.write_unit("a", &Payload::Raw(vec![1, 2])).unwrap();

        let keys: Vec<_> = writer.units().iter().map(|u| u.key.as_str()).collect();
        assert_eq!(keys, vec!["b", "a"]);
        assert_eq!(writer.total_bytes(), 3);
    }
}

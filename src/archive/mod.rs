//! Archive format for statepack
//!
//! An archive is a folder holding one descriptor plus a set of data units.
//!
//! # Layout
//!
//! - `descriptor`: `backup_schema_version` and `created_date` (epoch ms)
//! - `<key>_header`: `data_size`, `file_extension`, `encoding`, `entity_count`
//! - `<key>_data.json` / `<key>_data.bin`: the unit payload
//!
//! The `ArchiveProvider` trait is the seam between the orchestration layer
//! and the on-disk format; `FolderArchive` is the filesystem implementation.

pub mod descriptor;
pub mod reader;
pub mod unit;
pub mod writer;

use std::collections::BTreeSet;
use std::path::Path;

pub use descriptor::{
    Descriptor, CURRENT_SCHEMA_VERSION, DESCRIPTOR_FILE, MIN_SUPPORTED_SCHEMA_VERSION,
};
pub use reader::DataInputReader;
pub use unit::{validate_key, DataUnit, Encoding, Payload, UnitHeader};
pub use writer::DataOutputWriter;

use crate::error::BackupResult;

/// Sink for data units during a backup
pub trait UnitWriter {
    fn write_unit(&mut self, key: &str, payload: &Payload) -> BackupResult<UnitHeader>;
    fn close(&mut self) -> BackupResult<()>;
}

/// Source of data units during a restore
pub trait UnitReader {
    fn list_keys(&self) -> BackupResult<BTreeSet<String>>;
    fn read_header(&self, key: &str) -> BackupResult<UnitHeader>;
    fn read_unit(&self, key: &str) -> BackupResult<DataUnit>;
    fn close(&mut self) -> BackupResult<()>;
}

/// Opens writers and readers and encodes descriptors for one archive format
pub trait ArchiveProvider {
    type Writer: UnitWriter;
    type Reader: UnitReader;

    fn open_writer(&self, folder: &Path) -> BackupResult<Self::Writer>;
    fn open_reader(&self, folder: &Path) -> BackupResult<Self::Reader>;
    fn write_descriptor(&self, folder: &Path, descriptor: &Descriptor) -> BackupResult<()>;
    fn read_descriptor(&self, folder: &Path) -> BackupResult<Descriptor>;
}

impl UnitWriter for DataOutputWriter {
    fn write_unit(&mut self, key: &str, payload: &Payload) -> BackupResult<UnitHeader> {
        DataOutputWriter::write_unit(self, key, payload)
    }

    fn close(&mut self) -> BackupResult<()> {
        DataOutputWriter::close(self)
    }
}

impl UnitReader for DataInputReader {
    fn list_keys(&self) -> BackupResult<BTreeSet<String>> {
        DataInputReader::list_keys(self)
    }

    fn read_header(&self, key: &str) -> BackupResult<UnitHeader> {
        DataInputReader::read_header(self, key)
    }

    fn read_unit(&self, key: &str) -> BackupResult<DataUnit> {
        DataInputReader::read_unit(self, key)
    }

    fn close(&mut self) -> BackupResult<()> {
        DataInputReader::close(self)
    }
}

/// Archives stored as plain folders on the local filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct FolderArchive;

impl ArchiveProvider for FolderArchive {
    type Writer = DataOutputWriter;
    type Reader = DataInputReader;

    fn open_writer(&self, folder: &Path) -> BackupResult<DataOutputWriter> {
        DataOutputWriter::open(folder)
    }

    fn open_reader(&self, folder: &Path) -> BackupResult<DataInputReader> {
        DataInputReader::open(folder)
    }

    fn write_descriptor(&self, folder: &Path, descriptor: &Descriptor) -> BackupResult<()> {
        descriptor.store(folder)
    }

    fn read_descriptor(&self, folder: &Path) -> BackupResult<Descriptor> {
        Descriptor::read(folder)
    }
}

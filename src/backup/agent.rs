//! Backup agent
//!
//! Decides which logical data sets go into an archive and in what order,
//! and replays them on restore. Failures in one data set are logged and
//! counted; siblings still run. Only session-fatal errors abort.

use std::collections::BTreeSet;

use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};

use crate::archive::{Descriptor, Payload, UnitReader, UnitWriter, CURRENT_SCHEMA_VERSION};
use crate::error::{BackupError, BackupResult};
use crate::host::{DatabaseHandle, Host};
use crate::models::{DatabaseDump, PreferenceValue, Preferences, TableRow};

use super::counters::{BackupCounters, DataSet};
use super::migrate::upgrade_account;

/// Key of the preferences unit
pub const PREFERENCES_KEY: &str = "preferences";

/// Key of the unit declaring how many accounts follow
pub const ACCOUNT_HEADER_KEY: &str = "account_header";

/// Key of the unit holding every account record
pub const ACCOUNT_DATA_KEY: &str = "account_data";

/// Keys a database may never use
pub const RESERVED_KEYS: [&str; 3] = [PREFERENCES_KEY, ACCOUNT_HEADER_KEY, ACCOUNT_DATA_KEY];

/// Moves host state into and out of an archive
pub struct BackupAgent<'a> {
    host: &'a Host,
    /// Schema version of the archive being restored
    source_version: u32,
}

impl<'a> BackupAgent<'a> {
    /// Agent for backing up, or restoring a current-version archive
    pub fn new(host: &'a Host) -> Self {
        Self {
            host,
            source_version: CURRENT_SCHEMA_VERSION,
        }
    }

    /// Agent for restoring the archive described by `descriptor`
    pub fn for_archive(host: &'a Host, descriptor: &Descriptor) -> Self {
        Self {
            host,
            source_version: descriptor.schema_version,
        }
    }

    /// Archive key for a database
    pub fn database_key(name: &str) -> String {
        name.to_lowercase()
    }

    /// Every key this agent writes, or expects when restoring
    pub fn expected_keys(&self) -> BTreeSet<String> {
        let mut keys: BTreeSet<String> = RESERVED_KEYS.iter().map(|k| k.to_string()).collect();
        for database in &self.host.databases {
            keys.insert(Self::database_key(database.name()));
        }
        keys
    }

    /// Write preferences, each database in name order, then accounts
    pub fn backup<W: UnitWriter + ?Sized>(
        &self,
        writer: &mut W,
        counters: &mut BackupCounters,
    ) -> BackupResult<()> {
        match self.backup_preferences(writer, counters) {
            Ok(()) => counters.preferences_backed_up = 1,
            Err(e) => handle_failure(counters, DataSet::Preferences, PREFERENCES_KEY, e)?,
        }

        for database in self.host.sorted_databases() {
            counters.databases_total += 1;
            let key = Self::database_key(database.name());
            match backup_database(writer, database, &key, counters) {
                Ok(()) => counters.databases_backed_up += 1,
                Err(e) => handle_failure(counters, DataSet::Databases, &key, e)?,
            }
        }

        self.backup_accounts(writer, counters)
    }

    fn backup_preferences<W: UnitWriter + ?Sized>(
        &self,
        writer: &mut W,
        counters: &mut BackupCounters,
    ) -> BackupResult<()> {
        let preferences = self.host.preferences.get_all()?;
        let count = preferences.len();

        // JSON has no NaN or infinity; they would come back as null
        for (name, value) in &preferences {
            if let PreferenceValue::Float(f) = value {
                if !f.is_finite() {
                    return Err(BackupError::Format(format!(
                        "Preference '{}' holds a non-finite number ({})",
                        name, f
                    )));
                }
            }
        }

        let object = match serde_json::to_value(preferences)? {
            Value::Object(map) => map,
            _ => {
                return Err(BackupError::Format(
                    "Preferences did not serialize to an object".to_string(),
                ))
            }
        };

        write(writer, PREFERENCES_KEY, &Payload::Object(object), counters)?;
        info!(key = PREFERENCES_KEY, count, "Backed up preferences");
        Ok(())
    }

    fn backup_accounts<W: UnitWriter + ?Sized>(
        &self,
        writer: &mut W,
        counters: &mut BackupCounters,
    ) -> BackupResult<()> {
        let (header, data) = match self.account_payloads() {
            Ok(payloads) => payloads,
            Err(e) => return handle_failure(counters, DataSet::Accounts, ACCOUNT_DATA_KEY, e),
        };

        if let Err(e) = write(writer, ACCOUNT_HEADER_KEY, &header, counters) {
            return handle_failure(counters, DataSet::Accounts, ACCOUNT_HEADER_KEY, e);
        }

        match write(writer, ACCOUNT_DATA_KEY, &data, counters) {
            Ok(()) => {
                counters.accounts_backed_up = data.entity_count() as u32;
                info!(
                    key = ACCOUNT_DATA_KEY,
                    count = counters.accounts_backed_up,
                    "Backed up accounts"
                );
                Ok(())
            }
            Err(e) => handle_failure(counters, DataSet::Accounts, ACCOUNT_DATA_KEY, e),
        }
    }

    /// Header and data payloads for the account list
    fn account_payloads(&self) -> BackupResult<(Payload, Payload)> {
        let store = &self.host.accounts;
        let records = store
            .accounts()?
            .iter()
            .map(|account| store.to_portable_json(account))
            .collect::<BackupResult<Vec<_>>>()?;

        let data = Payload::Array(records);
        let data_size = data.to_bytes()?.len();

        let mut header = Map::new();
        header.insert("account_count".into(), json!(data.entity_count()));
        header.insert("data_size".into(), json!(data_size));

        Ok((Payload::Object(header), data))
    }

    /// Replay preferences, databases, then accounts from `reader`
    pub fn restore<R: UnitReader + ?Sized>(
        &self,
        reader: &R,
        counters: &mut BackupCounters,
    ) -> BackupResult<()> {
        let present = reader.list_keys()?;
        for key in present.difference(&self.expected_keys()) {
            warn!(key = %key, "Ignoring unexpected data unit");
            counters.unexpected_keys.push(key.clone());
        }

        match restore_preferences(reader, self.host) {
            Ok(count) => {
                counters.preferences_restored = 1;
                info!(key = PREFERENCES_KEY, count, "Restored preferences");
            }
            Err(e) => handle_failure(counters, DataSet::Preferences, PREFERENCES_KEY, e)?,
        }

        for database in self.host.sorted_databases() {
            counters.databases_total += 1;
            let key = Self::database_key(database.name());
            match restore_database(reader, database, &key) {
                Ok(rows) => {
                    counters.databases_restored += 1;
                    info!(key = %key, rows, "Restored database");
                }
                Err(e) => handle_failure(counters, DataSet::Databases, &key, e)?,
            }
        }

        self.restore_accounts(reader, counters)
    }

    /// Cross-check the account header against the account data unit
    pub fn check_accounts<R: UnitReader + ?Sized>(&self, reader: &R) -> BackupResult<()> {
        let mut scratch = BackupCounters::new();
        read_account_records(reader, &mut scratch)
            .map(|_| ())
            .map_err(|(_, e)| e)
    }

    fn restore_accounts<R: UnitReader + ?Sized>(
        &self,
        reader: &R,
        counters: &mut BackupCounters,
    ) -> BackupResult<()> {
        let records = match read_account_records(reader, counters) {
            Ok(records) => records,
            Err((key, e)) => return handle_failure(counters, DataSet::Accounts, key, e),
        };

        let store = &self.host.accounts;
        let mut accounts = Vec::with_capacity(records.len());
        let mut rejected = 0;
        for (index, record) in records.into_iter().enumerate() {
            let decoded = upgrade_account(record, self.source_version)
                .and_then(|record| store.from_portable_json(record));
            match decoded {
                Ok(account) => accounts.push(account),
                Err(e) => {
                    rejected += 1;
                    handle_failure(
                        counters,
                        DataSet::Accounts,
                        format!("{}[{}]", ACCOUNT_DATA_KEY, index),
                        e,
                    )?
                }
            }
        }

        // Never replace the live list with a subset
        if rejected > 0 {
            warn!(
                key = ACCOUNT_DATA_KEY,
                rejected,
                "Account list left unchanged"
            );
            return Ok(());
        }

        let restored = accounts.len() as u32;
        match store.replace_all(accounts) {
            Ok(()) => {
                counters.accounts_restored = restored;
                info!(
                    key = ACCOUNT_DATA_KEY,
                    count = restored,
                    declared = counters.accounts_declared,
                    "Restored accounts"
                );
                Ok(())
            }
            Err(e) => handle_failure(counters, DataSet::Accounts, ACCOUNT_DATA_KEY, e),
        }
    }
}

/// Log and record a per-unit failure; session-fatal errors propagate
fn handle_failure(
    counters: &mut BackupCounters,
    data_set: DataSet,
    key: impl Into<String>,
    error: BackupError,
) -> BackupResult<()> {
    let key = key.into();
    if error.is_session_fatal() {
        return Err(error);
    }
    warn!(key = %key, data_set = %data_set, error = %error, "Data unit failed");
    counters.record_failure(data_set, key, error);
    Ok(())
}

fn write<W: UnitWriter + ?Sized>(
    writer: &mut W,
    key: &str,
    payload: &Payload,
    counters: &mut BackupCounters,
) -> BackupResult<()> {
    let header = writer.write_unit(key, payload)?;
    counters.units_written += 1;
    counters.bytes_written += header.size_bytes;
    Ok(())
}

/// Run `f` with the database open; it is closed on every path
fn with_open<T>(
    database: &dyn DatabaseHandle,
    f: impl FnOnce(&dyn DatabaseHandle) -> BackupResult<T>,
) -> BackupResult<T> {
    database.open()?;
    let result = f(database);
    let closed = database.close();

    let value = result?;
    closed?;
    Ok(value)
}

fn backup_database<W: UnitWriter + ?Sized>(
    writer: &mut W,
    database: &dyn DatabaseHandle,
    key: &str,
    counters: &mut BackupCounters,
) -> BackupResult<()> {
    let payload = with_open(database, |db| match db.dump()? {
        DatabaseDump::Rows(rows) => {
            let rows = rows
                .iter()
                .map(serde_json::to_value)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Payload::Array(rows))
        }
        DatabaseDump::Raw(image) => Ok(Payload::Raw(image)),
    })?;

    write(writer, key, &payload, counters)?;
    info!(key, entities = payload.entity_count(), "Backed up database");
    Ok(())
}

fn restore_preferences<R: UnitReader + ?Sized>(reader: &R, host: &Host) -> BackupResult<usize> {
    let object = reader.read_unit(PREFERENCES_KEY)?.payload.into_object(PREFERENCES_KEY)?;

    let mut preferences = Preferences::new();
    for (name, value) in object {
        let value: PreferenceValue = serde_json::from_value(value).map_err(|e| {
            BackupError::Format(format!("Invalid value for preference '{}': {}", name, e))
        })?;
        preferences.insert(name, value);
    }

    let count = preferences.len();
    host.preferences.put_all(preferences)?;
    Ok(count)
}

fn restore_database<R: UnitReader + ?Sized>(
    reader: &R,
    database: &dyn DatabaseHandle,
    key: &str,
) -> BackupResult<usize> {
    let unit = reader.read_unit(key)?;
    let dump = match unit.payload {
        Payload::Array(rows) => DatabaseDump::Rows(
            rows.into_iter()
                .map(|row| {
                    serde_json::from_value::<TableRow>(row).map_err(|e| {
                        BackupError::Format(format!("Invalid row in '{}': {}", key, e))
                    })
                })
                .collect::<BackupResult<Vec<_>>>()?,
        ),
        Payload::Raw(image) => DatabaseDump::Raw(image),
        Payload::Object(_) => {
            return Err(BackupError::Format(format!(
                "Database unit '{}' must be json_array or raw_bytes",
                key
            )))
        }
    };

    let rows = dump.entity_count();
    with_open(database, |db| db.load(dump))?;
    Ok(rows)
}

/// Read and cross-check the account header and data units
///
/// Errors carry the key of the unit that failed.
fn read_account_records<R: UnitReader + ?Sized>(
    reader: &R,
    counters: &mut BackupCounters,
) -> Result<Vec<Value>, (&'static str, BackupError)> {
    let header = reader
        .read_unit(ACCOUNT_HEADER_KEY)
        .and_then(|unit| unit.payload.into_object(ACCOUNT_HEADER_KEY))
        .map_err(|e| (ACCOUNT_HEADER_KEY, e))?;

    let field = |name: &str| {
        header.get(name).and_then(Value::as_u64).ok_or_else(|| {
            (
                ACCOUNT_HEADER_KEY,
                BackupError::Format(format!("Account header is missing '{}'", name)),
            )
        })
    };
    let declared = field("account_count")?;
    let data_size = field("data_size")?;
    counters.accounts_declared = declared as u32;

    let unit = reader
        .read_unit(ACCOUNT_DATA_KEY)
        .map_err(|e| (ACCOUNT_DATA_KEY, e))?;
    if unit.size_bytes != data_size {
        return Err((
            ACCOUNT_DATA_KEY,
            BackupError::size_mismatch(ACCOUNT_DATA_KEY, data_size, unit.size_bytes),
        ));
    }

    let records = unit
        .payload
        .into_array(ACCOUNT_DATA_KEY)
        .map_err(|e| (ACCOUNT_DATA_KEY, e))?;
    if records.len() as u64 != declared {
        return Err((
            ACCOUNT_DATA_KEY,
            BackupError::Format(format!(
                "Account header declares {} accounts but data holds {}",
                declared,
                records.len()
            )),
        ));
    }

    debug!(count = records.len(), "Account units cross-checked");
    Ok(records)
}

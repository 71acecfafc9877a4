//! Record store contract and SQLite implementation.
//!
//! # Responsibility
//! - Persist per-tag done history and to-do markers.
//! - Persist the single installation state row.
//! - Keep SQL details inside the persistence boundary.
//!
//! # Invariants
//! - Multi-statement writes run in one transaction; a failed write leaves the
//!   previous contents in place.
//! - Rows that cannot be decoded read as absent instead of failing the query.
//!   The caller gets `Ok(None)` and a `warn` event is emitted.
//! - The next write to such a tag discards the undecodable rows first, so the
//!   tag starts a fresh record.

use crate::db::{open_db, open_db_in_memory, DbError};
use crate::model::record::{EpochMs, InstallationState, OccurrenceRecord, ToDoMarker};
use log::warn;
use rusqlite::types::Value;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;
use uuid::Uuid;

pub type RepoResult<T> = Result<T, RepoError>;

/// Record store error for persistence and decoding failures.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted record data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Durable storage for occurrence records and installation state.
///
/// Implementations are driven by one caller at a time; the engine serializes
/// access behind its own lock.
pub trait RecordStore {
    fn load(&self, tag: &str) -> RepoResult<Option<OccurrenceRecord>>;

    /// Replaces the whole record for `tag`. An empty record deletes it.
    fn store(&mut self, tag: &str, record: &OccurrenceRecord) -> RepoResult<()>;

    fn delete(&mut self, tag: &str) -> RepoResult<()>;

    /// Deletes every record and replaces the installation state in one step.
    fn delete_all(&mut self, fresh_state: &InstallationState) -> RepoResult<()>;

    fn load_installation_state(&self) -> RepoResult<Option<InstallationState>>;

    fn store_installation_state(&mut self, state: &InstallationState) -> RepoResult<()>;

    /// Every tag with a stored record, ascending.
    fn tags(&self) -> RepoResult<Vec<String>>;

    fn append_done(&mut self, tag: &str, at: EpochMs) -> RepoResult<()> {
        let mut record = self.load(tag)?.unwrap_or_default();
        record.push_done(at);
        self.store(tag, &record)
    }

    /// Arms a redo request that only a later `append_done` satisfies.
    fn set_to_do_marker(&mut self, tag: &str, at: EpochMs) -> RepoResult<()> {
        let mut record = self.load(tag)?.unwrap_or_default();
        record.request_redo(at);
        self.store(tag, &record)
    }
}

/// SQLite-backed record store owning its connection.
pub struct SqliteRecordStore {
    conn: Connection,
}

impl SqliteRecordStore {
    /// Wraps a connection that already has migrations applied.
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    /// Opens (or creates) a store file and applies migrations.
    pub fn open(path: impl AsRef<Path>) -> RepoResult<Self> {
        Ok(Self::new(open_db(path)?))
    }

    pub fn open_in_memory() -> RepoResult<Self> {
        Ok(Self::new(open_db_in_memory()?))
    }

    fn read_installation_state(&self) -> RepoResult<Option<InstallationState>> {
        let mut stmt = self.conn.prepare(
            "SELECT install_id, installed_at, version_marker, version_start_time
             FROM installation_state
             WHERE id = 1;",
        )?;
        let mut rows = stmt.query([])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_installation_row(row)?)),
            None => Ok(None),
        }
    }
}

impl RecordStore for SqliteRecordStore {
    fn load(&self, tag: &str) -> RepoResult<Option<OccurrenceRecord>> {
        match read_record(&self.conn, tag) {
            Err(RepoError::InvalidData(message)) => {
                warn!(
                    "event=record_load module=repo status=corrupt tag_len={} error={}",
                    tag.len(),
                    message
                );
                Ok(None)
            }
            other => other,
        }
    }

    fn store(&mut self, tag: &str, record: &OccurrenceRecord) -> RepoResult<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM occurrences WHERE tag = ?1;", [tag])?;
        tx.execute("DELETE FROM todo_markers WHERE tag = ?1;", [tag])?;
        {
            let mut insert =
                tx.prepare("INSERT INTO occurrences (tag, done_at) VALUES (?1, ?2);")?;
            for done_at in &record.done_timestamps {
                insert.execute(params![tag, done_at])?;
            }
        }
        if let Some(marker) = record.to_do_marker {
            tx.execute(
                "INSERT INTO todo_markers (tag, requested_at, done_before) VALUES (?1, ?2, ?3);",
                params![tag, marker.requested_at, count_to_sql(marker.done_before)?],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    fn delete(&mut self, tag: &str) -> RepoResult<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM occurrences WHERE tag = ?1;", [tag])?;
        tx.execute("DELETE FROM todo_markers WHERE tag = ?1;", [tag])?;
        tx.commit()?;
        Ok(())
    }

    fn delete_all(&mut self, fresh_state: &InstallationState) -> RepoResult<()> {
        let tx = self.conn.transaction()?;
        tx.execute_batch(
            "DELETE FROM occurrences;
             DELETE FROM todo_markers;
             DELETE FROM installation_state;",
        )?;
        insert_installation_state(&tx, fresh_state)?;
        tx.commit()?;
        Ok(())
    }

    fn load_installation_state(&self) -> RepoResult<Option<InstallationState>> {
        match self.read_installation_state() {
            Err(RepoError::InvalidData(message)) => {
                warn!(
                    "event=installation_load module=repo status=corrupt error={}",
                    message
                );
                Ok(None)
            }
            other => other,
        }
    }

    fn store_installation_state(&mut self, state: &InstallationState) -> RepoResult<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM installation_state;", [])?;
        insert_installation_state(&tx, state)?;
        tx.commit()?;
        Ok(())
    }

    fn tags(&self) -> RepoResult<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT tag FROM occurrences
             UNION
             SELECT tag FROM todo_markers
             ORDER BY tag ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut tags = Vec::new();
        while let Some(row) = rows.next()? {
            tags.push(row.get("tag")?);
        }
        Ok(tags)
    }

    fn append_done(&mut self, tag: &str, at: EpochMs) -> RepoResult<()> {
        let tx = self.conn.transaction()?;
        discard_if_corrupt(&tx, tag)?;
        tx.execute(
            "INSERT INTO occurrences (tag, done_at) VALUES (?1, ?2);",
            params![tag, at],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn set_to_do_marker(&mut self, tag: &str, at: EpochMs) -> RepoResult<()> {
        let tx = self.conn.transaction()?;
        discard_if_corrupt(&tx, tag)?;
        tx.execute(
            "INSERT INTO todo_markers (tag, requested_at, done_before)
             VALUES (?1, ?2, (SELECT COUNT(*) FROM occurrences WHERE tag = ?1))
             ON CONFLICT(tag) DO UPDATE SET
                requested_at = excluded.requested_at,
                done_before = excluded.done_before;",
            params![tag, at],
        )?;
        tx.commit()?;
        Ok(())
    }
}

fn read_record(conn: &Connection, tag: &str) -> RepoResult<Option<OccurrenceRecord>> {
    let mut stmt = conn.prepare("SELECT done_at FROM occurrences WHERE tag = ?1 ORDER BY id ASC;")?;
    let mut rows = stmt.query([tag])?;
    let mut done_timestamps = Vec::new();
    while let Some(row) = rows.next()? {
        done_timestamps.push(parse_epoch_ms(row, "done_at", "occurrences.done_at")?);
    }

    let mut stmt =
        conn.prepare("SELECT requested_at, done_before FROM todo_markers WHERE tag = ?1;")?;
    let to_do_marker = stmt
        .query_row([tag], |row| Ok((row.get::<_, Value>(0)?, row.get::<_, Value>(1)?)))
        .optional()?
        .map(|(requested_at, done_before)| -> RepoResult<ToDoMarker> {
            Ok(ToDoMarker {
                requested_at: value_to_epoch_ms(requested_at, "todo_markers.requested_at")?,
                done_before: value_to_count(done_before, "todo_markers.done_before")?,
            })
        })
        .transpose()?;

    let record = OccurrenceRecord {
        done_timestamps,
        to_do_marker,
    };
    if record.is_empty() {
        return Ok(None);
    }
    Ok(Some(record))
}

// Runs inside the caller's transaction, before its insert.
fn discard_if_corrupt(conn: &Connection, tag: &str) -> RepoResult<()> {
    match read_record(conn, tag) {
        Err(RepoError::InvalidData(message)) => {
            warn!(
                "event=record_repair module=repo status=discarded tag_len={} error={}",
                tag.len(),
                message
            );
            conn.execute("DELETE FROM occurrences WHERE tag = ?1;", [tag])?;
            conn.execute("DELETE FROM todo_markers WHERE tag = ?1;", [tag])?;
            Ok(())
        }
        Err(err) => Err(err),
        Ok(_) => Ok(()),
    }
}

fn insert_installation_state(conn: &Connection, state: &InstallationState) -> RepoResult<()> {
    conn.execute(
        "INSERT INTO installation_state (
            id,
            install_id,
            installed_at,
            version_marker,
            version_start_time
        ) VALUES (1, ?1, ?2, ?3, ?4);",
        params![
            state.install_id.to_string(),
            state.installed_at,
            state.version_marker.as_str(),
            state.version_start_time,
        ],
    )?;
    Ok(())
}

fn parse_installation_row(row: &Row<'_>) -> RepoResult<InstallationState> {
    let id_value: Value = row.get("install_id")?;
    let install_id = match id_value {
        Value::Text(text) => Uuid::parse_str(&text).map_err(|_| {
            RepoError::InvalidData(format!(
                "invalid uuid value `{text}` in installation_state.install_id"
            ))
        })?,
        other => {
            return Err(RepoError::InvalidData(format!(
                "non-text value `{other:?}` in installation_state.install_id"
            )));
        }
    };

    let version_marker = match row.get::<_, Value>("version_marker")? {
        Value::Text(text) => text,
        other => {
            return Err(RepoError::InvalidData(format!(
                "non-text value `{other:?}` in installation_state.version_marker"
            )));
        }
    };

    Ok(InstallationState {
        install_id,
        installed_at: parse_epoch_ms(row, "installed_at", "installation_state.installed_at")?,
        version_marker,
        version_start_time: parse_epoch_ms(
            row,
            "version_start_time",
            "installation_state.version_start_time",
        )?,
    })
}

fn parse_epoch_ms(row: &Row<'_>, column: &str, qualified: &str) -> RepoResult<EpochMs> {
    value_to_epoch_ms(row.get::<_, Value>(column)?, qualified)
}

// SQLite keeps non-numeric text in INTEGER columns, so the type is checked here.
fn value_to_epoch_ms(value: Value, qualified: &str) -> RepoResult<EpochMs> {
    match value {
        Value::Integer(ms) => Ok(ms),
        other => Err(RepoError::InvalidData(format!(
            "non-integer timestamp `{other:?}` in {qualified}"
        ))),
    }
}

fn value_to_count(value: Value, qualified: &str) -> RepoResult<usize> {
    match value {
        Value::Integer(count) => usize::try_from(count).map_err(|_| {
            RepoError::InvalidData(format!("negative count `{count}` in {qualified}"))
        }),
        other => Err(RepoError::InvalidData(format!(
            "non-integer count `{other:?}` in {qualified}"
        ))),
    }
}

fn count_to_sql(count: usize) -> RepoResult<i64> {
    i64::try_from(count)
        .map_err(|_| RepoError::InvalidData(format!("count `{count}` exceeds the integer range")))
}

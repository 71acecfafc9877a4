//! SQLite bootstrap for the record store.
//!
//! # Responsibility
//! - Open the store file (or an in-memory store) and bring its schema current.
//! - Report where a store failed: opening, migrating, or a later statement.
//!
//! # Invariants
//! - Schema version lives in `PRAGMA user_version`.
//! - Records are never touched before the schema is current.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

/// Store bootstrap and statement failure.
#[derive(Debug)]
pub enum DbError {
    /// The connection itself could not be established.
    Open {
        location: String,
        source: rusqlite::Error,
    },
    /// A schema step failed and was rolled back; the store keeps
    /// `from_version`.
    Migration {
        from_version: u32,
        failed_version: u32,
        source: rusqlite::Error,
    },
    /// The store was written by a newer build and is left untouched.
    UnsupportedSchemaVersion { found: u32, supported: u32 },
    Sqlite(rusqlite::Error),
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open { location, source } => {
                write!(f, "cannot open store `{location}`: {source}")
            }
            Self::Migration {
                from_version,
                failed_version,
                source,
            } => write!(
                f,
                "store migration to schema {failed_version} failed (store kept at {from_version}): {source}"
            ),
            Self::UnsupportedSchemaVersion { found, supported } => write!(
                f,
                "store schema {found} was written by a newer build; this build reads up to {supported}"
            ),
            Self::Sqlite(err) => write!(f, "{err}"),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Open { source, .. } | Self::Migration { source, .. } => Some(source),
            Self::Sqlite(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

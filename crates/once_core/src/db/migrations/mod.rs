//! Schema steps for the record store.
//!
//! Each step is one SQL file applied in version order. All pending steps share
//! one transaction, so a store is either fully upgraded or left as it was.

use crate::db::{DbError, DbResult};
use log::{error, info};
use rusqlite::Connection;

struct SchemaStep {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const SCHEMA_STEPS: &[SchemaStep] = &[SchemaStep {
    version: 1,
    name: "init",
    sql: include_str!("0001_init.sql"),
}];

/// Highest schema version this build can read and write.
pub fn latest_version() -> u32 {
    SCHEMA_STEPS.last().map_or(0, |step| step.version)
}

/// Schema version recorded in the store.
pub fn schema_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?)
}

/// Brings the store up to [`latest_version`] and returns how many steps ran.
///
/// # Errors
/// - [`DbError::UnsupportedSchemaVersion`] when the store is ahead of this build.
/// - [`DbError::Migration`] when a step fails; nothing is applied.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<usize> {
    let from_version = schema_version(conn)?;
    let supported = latest_version();
    if from_version > supported {
        return Err(DbError::UnsupportedSchemaVersion {
            found: from_version,
            supported,
        });
    }

    let pending: Vec<&SchemaStep> = SCHEMA_STEPS
        .iter()
        .filter(|step| step.version > from_version)
        .collect();
    if pending.is_empty() {
        return Ok(0);
    }

    let tx = conn.transaction()?;
    for step in &pending {
        let applied = tx.execute_batch(step.sql).and_then(|()| {
            tx.execute_batch(&format!("PRAGMA user_version = {};", step.version))
        });
        if let Err(source) = applied {
            error!(
                "event=db_migrate module=db status=error from_version={} step={} name={} error={}",
                from_version, step.version, step.name, source
            );
            return Err(DbError::Migration {
                from_version,
                failed_version: step.version,
                source,
            });
        }
    }
    tx.commit()?;

    info!(
        "event=db_migrate module=db status=ok from_version={} to_version={} steps={}",
        from_version,
        supported,
        pending.len()
    );
    Ok(pending.len())
}

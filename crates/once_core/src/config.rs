//! Store location settings and engine bootstrap.
//!
//! # Responsibility
//! - Name where the persistent store lives.
//! - Open a ready-to-use engine over the SQLite store.
//!
//! # Invariants
//! - The returned engine is already initialized.

use crate::clock::SystemClock;
use crate::repo::record_repo::SqliteRecordStore;
use crate::service::occurrence_service::{EngineResult, OccurrenceEngine};
use crate::version::VersionOracle;
use std::path::{Path, PathBuf};

/// Default store file name inside an application data directory.
pub const DEFAULT_DB_FILE_NAME: &str = "once.sqlite3";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub db_path: PathBuf,
}

impl EngineConfig {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
        }
    }

    /// Uses `DEFAULT_DB_FILE_NAME` inside `dir`.
    ///
    /// Point `dir` at install-scoped storage so the store goes away on uninstall.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join(DEFAULT_DB_FILE_NAME))
    }
}

/// Opens the store at `config.db_path` and initializes an engine on it.
///
/// # Errors
/// - `Storage` when the file cannot be opened, migrated or read.
pub fn open_engine(
    config: &EngineConfig,
    oracle: impl VersionOracle + Send + Sync + 'static,
) -> EngineResult<OccurrenceEngine<SqliteRecordStore>> {
    let store = SqliteRecordStore::open(&config.db_path)?;
    let engine = OccurrenceEngine::new(store, SystemClock, oracle);
    engine.initialize()?;
    Ok(engine)
}

#[cfg(test)]
mod tests {
    use super::{open_engine, EngineConfig, DEFAULT_DB_FILE_NAME};
    use crate::model::scope::DoneFilter;
    use crate::version::StaticVersionOracle;

    #[test]
    fn in_dir_uses_default_file_name() {
        let config = EngineConfig::in_dir("/data/app");
        assert!(config.db_path.ends_with(DEFAULT_DB_FILE_NAME));
    }

    #[test]
    fn open_engine_creates_store_file_and_is_ready() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let config = EngineConfig::in_dir(dir.path());

        let engine = open_engine(&config, StaticVersionOracle::new("v1", 0))
            .expect("engine should open in a writable dir");
        engine.mark_done("opened").expect("mark_done should succeed");

        assert!(config.db_path.exists());
        assert!(engine
            .been_done("opened", &DoneFilter::new())
            .expect("been_done should succeed"));
    }
}

//! Rotating file logs for hosts embedding the engine.
//!
//! Engine events are metadata-only lines (`event=... module=... status=...`);
//! tag text never reaches the log, only its length does. Logging is started
//! at most once per process; asking again with the same level and directory
//! is a no-op, anything else is rejected.

use flexi_logger::{
    Cleanup, Criterion, FileSpec, LogSpecification, Logger, LoggerHandle, Naming, WriteMode,
};
use log::{info, LevelFilter};
use once_cell::sync::OnceCell;
use std::path::{Path, PathBuf};

const LOG_FILE_BASENAME: &str = "once";
const MAX_LOG_FILE_SIZE_BYTES: u64 = 10 * 1024 * 1024;
const MAX_LOG_FILES: usize = 5;

static ACTIVE_LOGGER: OnceCell<ActiveLogger> = OnceCell::new();

struct ActiveLogger {
    level: LevelFilter,
    log_dir: PathBuf,
    _handle: LoggerHandle,
}

impl ActiveLogger {
    fn accepts(&self, level: LevelFilter, log_dir: &Path) -> Result<(), String> {
        if self.level == level && self.log_dir == log_dir {
            return Ok(());
        }
        Err(format!(
            "logging already writes `{}` at `{}`; refusing `{}` at `{}`",
            self.level,
            self.log_dir.display(),
            level,
            log_dir.display()
        ))
    }
}

/// Starts file logging into `log_dir` at `level`.
///
/// # Errors
/// - `level` is not one of `trace|debug|info|warn|error`.
/// - `log_dir` is not an absolute path or cannot be created.
/// - Logging is already active with a different level or directory.
pub fn init_logging(level: &str, log_dir: &str) -> Result<(), String> {
    let level = parse_level(level)?;
    let log_dir = absolute_dir(log_dir)?;

    let active = ACTIVE_LOGGER.get_or_try_init(|| -> Result<ActiveLogger, String> {
        let handle = start_logger(level, &log_dir)?;
        info!(
            "event=logging_init module=logging status=ok version={} level={} log_dir={}",
            env!("CARGO_PKG_VERSION"),
            level,
            log_dir.display()
        );
        Ok(ActiveLogger {
            level,
            log_dir: log_dir.clone(),
            _handle: handle,
        })
    })?;
    active.accepts(level, &log_dir)
}

/// Active `(level, log_dir)`, if logging was started.
pub fn logging_status() -> Option<(LevelFilter, PathBuf)> {
    ACTIVE_LOGGER
        .get()
        .map(|active| (active.level, active.log_dir.clone()))
}

/// `debug` for debug builds, `info` otherwise.
pub fn default_log_level() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    }
}

fn start_logger(level: LevelFilter, log_dir: &Path) -> Result<LoggerHandle, String> {
    std::fs::create_dir_all(log_dir).map_err(|err| {
        format!(
            "failed to create log directory `{}`: {err}",
            log_dir.display()
        )
    })?;

    Logger::with(LogSpecification::builder().default(level).build())
        .log_to_file(
            FileSpec::default()
                .directory(log_dir)
                .basename(LOG_FILE_BASENAME),
        )
        .rotate(
            Criterion::Size(MAX_LOG_FILE_SIZE_BYTES),
            Naming::Numbers,
            Cleanup::KeepLogFiles(MAX_LOG_FILES),
        )
        .write_mode(WriteMode::BufferAndFlush)
        .append()
        .format_for_files(flexi_logger::detailed_format)
        .start()
        .map_err(|err| format!("failed to start logger: {err}"))
}

// `off` is refused: leaving logging uninitialized already means off.
fn parse_level(level: &str) -> Result<LevelFilter, String> {
    match level.trim().parse::<LevelFilter>() {
        Ok(LevelFilter::Off) | Err(_) => Err(format!(
            "unsupported log level `{}`; expected trace|debug|info|warn|error",
            level.trim()
        )),
        Ok(level) => Ok(level),
    }
}

fn absolute_dir(log_dir: &str) -> Result<PathBuf, String> {
    let path = Path::new(log_dir.trim());
    if !path.is_absolute() {
        return Err(format!(
            "log_dir must be an absolute path, got `{}`",
            log_dir.trim()
        ));
    }
    Ok(path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::{absolute_dir, init_logging, logging_status, parse_level};
    use log::LevelFilter;

    #[test]
    fn parse_level_is_case_insensitive_and_refuses_off() {
        assert_eq!(
            parse_level(" DEBUG ").expect("known level should parse"),
            LevelFilter::Debug
        );
        assert!(parse_level("off").is_err());
        assert!(parse_level("verbose").is_err());
    }

    #[test]
    fn absolute_dir_rejects_relative_and_empty_paths() {
        assert!(absolute_dir("logs/once")
            .expect_err("relative dir should be rejected")
            .contains("absolute"));
        assert!(absolute_dir("   ").is_err());
    }

    #[test]
    fn init_logging_is_idempotent_and_rejects_conflicts() {
        let first = tempfile::tempdir().expect("temp dir should be created");
        let second = tempfile::tempdir().expect("temp dir should be created");
        let first_dir = first.path().to_str().expect("temp path should be utf-8");
        let second_dir = second.path().to_str().expect("temp path should be utf-8");

        init_logging("info", first_dir).expect("first init should succeed");
        init_logging("INFO", first_dir).expect("same settings should be accepted");

        let level_error =
            init_logging("debug", first_dir).expect_err("level switch should be rejected");
        assert!(level_error.contains("refusing"));

        let dir_error =
            init_logging("info", second_dir).expect_err("dir switch should be rejected");
        assert!(dir_error.contains("refusing"));

        let (active_level, active_dir) = logging_status().expect("logging should be active");
        assert_eq!(active_level, LevelFilter::Info);
        assert_eq!(active_dir, first.path());
    }
}

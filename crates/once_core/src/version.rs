//! Host version identity used for `Scope::Version` boundaries.
//!
//! # Responsibility
//! - Report an opaque marker that changes when the host is updated.
//! - Report when the current version started.
//!
//! # Invariants
//! - The marker is compared for equality only, never ordered.

use crate::clock::system_time_to_epoch_ms;
use crate::model::record::EpochMs;
use std::io;
use std::path::Path;

pub trait VersionOracle {
    fn version_marker(&self) -> String;
    fn version_start_time(&self) -> EpochMs;
}

/// Oracle with caller-provided values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticVersionOracle {
    marker: String,
    start_time: EpochMs,
}

impl StaticVersionOracle {
    pub fn new(marker: impl Into<String>, start_time: EpochMs) -> Self {
        Self {
            marker: marker.into(),
            start_time,
        }
    }
}

impl VersionOracle for StaticVersionOracle {
    fn version_marker(&self) -> String {
        self.marker.clone()
    }

    fn version_start_time(&self) -> EpochMs {
        self.start_time
    }
}

/// Oracle derived from the running executable.
///
/// The executable's modification time stands in for "last updated": replacing
/// the binary moves the version boundary even when `version` is unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutableVersionOracle {
    inner: StaticVersionOracle,
}

impl ExecutableVersionOracle {
    /// Reads the current executable's metadata once.
    ///
    /// # Errors
    /// - Returns an I/O error when the executable path or its metadata cannot
    ///   be read.
    pub fn detect(version: &str) -> io::Result<Self> {
        let exe = std::env::current_exe()?;
        Self::from_path(version, &exe)
    }

    /// Same as [`ExecutableVersionOracle::detect`] for an explicit file.
    pub fn from_path(version: &str, path: &Path) -> io::Result<Self> {
        let modified = std::fs::metadata(path)?.modified()?;
        let start_time = system_time_to_epoch_ms(modified);
        Ok(Self {
            inner: StaticVersionOracle::new(format!("{version}@{start_time}"), start_time),
        })
    }
}

impl VersionOracle for ExecutableVersionOracle {
    fn version_marker(&self) -> String {
        self.inner.version_marker()
    }

    fn version_start_time(&self) -> EpochMs {
        self.inner.version_start_time()
    }
}

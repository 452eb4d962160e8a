//! Error taxonomy for anchor operations

use crate::manager::RestoreReport;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for anchor operations
pub type Result<T> = std::result::Result<T, AnchorError>;

/// Errors raised by the anchor manager and registry
#[derive(Debug, Error)]
pub enum AnchorError {
    /// Named anchor does not exist
    #[error("anchor '{0}' not found")]
    NotFound(String),

    /// A conflicting manual/background operation holds the anchor
    #[error("anchor '{0}' is busy: a tracking batch or another operation is in flight")]
    Busy(String),

    /// Store-level failure (I/O, integrity, layout)
    #[error(transparent)]
    Core(#[from] moor_core::CoreError),

    /// Filesystem failure outside the store, carrying the failing path
    #[error("{path}: {source}", path = .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Watcher failed to start
    #[error("watcher failed to start: {0}")]
    Watcher(#[from] moor_watcher::WatcherError),

    /// Background monitor died unexpectedly
    #[error("watcher terminated: {0}")]
    WatcherTerminated(String),

    /// Registry database failure
    #[error("anchor registry error: {0}")]
    Registry(String),

    /// Multi-file restore completed with per-path failures
    #[error("restore of '{name}' incomplete: {} path(s) failed", .report.failures.len())]
    RestoreFailed { name: String, report: RestoreReport },

    /// Export file failed validation
    #[error("invalid anchor export: {0}")]
    InvalidExport(String),
}

impl AnchorError {
    /// Wrap an I/O error with the path it occurred on
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<sled::Error> for AnchorError {
    fn from(e: sled::Error) -> Self {
        Self::Registry(e.to_string())
    }
}

impl From<Box<bincode::ErrorKind>> for AnchorError {
    fn from(e: Box<bincode::ErrorKind>) -> Self {
        Self::Registry(format!("record encoding: {e}"))
    }
}

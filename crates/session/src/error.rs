//! Error taxonomy for recording and replay

use std::path::PathBuf;
use thiserror::Error;

/// Result type for session operations
pub type Result<T> = std::result::Result<T, SessionError>;

/// Errors raised by the recorder, player, and journey registry
#[derive(Debug, Error)]
pub enum SessionError {
    /// Named journey does not exist
    #[error("journey '{0}' not found")]
    NotFound(String),

    /// Serialization violation on a recording session
    #[error("concurrent access to recording session: {0}")]
    ConcurrentAccess(String),

    /// Append after the recording ended
    #[error("recording '{0}' is already closed")]
    RecordingClosed(String),

    /// Filesystem failure, carrying the failing path
    #[error("{path}: {source}", path = .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Command execution collaborator failed to run a step
    #[error("failed to execute '{command}': {source}")]
    Exec {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// Strict-mode replay hit a step whose live exit status diverged
    #[error("step {step} '{command}' diverged: recorded exit {recorded}, live exit {live}")]
    Divergence {
        step: usize,
        command: String,
        recorded: i32,
        live: i32,
    },

    /// Registry database failure
    #[error("journey registry error: {0}")]
    Registry(String),

    /// Export file failed validation
    #[error("invalid journey export: {0}")]
    InvalidExport(String),
}

impl SessionError {
    /// Wrap an I/O error with the path it occurred on
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<sled::Error> for SessionError {
    fn from(e: sled::Error) -> Self {
        Self::Registry(e.to_string())
    }
}

impl From<Box<bincode::ErrorKind>> for SessionError {
    fn from(e: Box<bincode::ErrorKind>) -> Self {
        Self::Registry(format!("record encoding: {e}"))
    }
}

//! Error taxonomy for store operations

use std::path::PathBuf;
use thiserror::Error;

/// Result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors raised by the snapshot store and its helpers
#[derive(Debug, Error)]
pub enum CoreError {
    /// Filesystem failure, carrying the path that failed
    #[error("{path}: {source}", path = .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Hash collision or corrupted stored content
    #[error("data integrity violation: {0}")]
    DataIntegrity(String),

    /// Path rejected by normalization (absolute, traversal)
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// Store directory missing
    #[error("store not initialized at {}", .0.display())]
    NotInitialized(PathBuf),

    /// `init` called on an existing store
    #[error("store already initialized at {}", .0.display())]
    AlreadyInitialized(PathBuf),

    /// Stored data failed to parse or validate
    #[error("corrupt store data: {0}")]
    Corrupt(String),

    /// config.toml failed to parse or serialize
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl CoreError {
    /// Wrap an I/O error with the path it occurred on
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_io_error_carries_path() {
        let err = CoreError::io(
            Path::new("src/lost.rs"),
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        let message = err.to_string();
        assert!(message.contains("src/lost.rs"));
        assert!(message.contains("gone"));
    }

    #[test]
    fn test_data_integrity_display() {
        let err = CoreError::DataIntegrity("hash collision on abc".to_string());
        assert!(err.to_string().contains("data integrity"));
        assert!(err.to_string().contains("hash collision"));
    }
}

//! Store configuration loaded from `.moor/config.toml`

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub store: StoreSection,
    pub watcher: WatcherSection,
}

/// `[store]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSection {
    /// Store format version
    pub version: u32,
    /// Blob contents above this size are compressed
    pub compression_threshold: u64,
}

/// `[watcher]` section
///
/// The debounce window is configuration, not a constant: rapid repeated
/// modifications to one path inside the window collapse into a single event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatcherSection {
    /// Per-path debounce window in milliseconds
    pub debounce_ms: u64,
    /// Batch delivery timeout in milliseconds
    pub batch_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            store: StoreSection::default(),
            watcher: WatcherSection::default(),
        }
    }
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            version: 1,
            compression_threshold: 4096,
        }
    }
}

impl Default for WatcherSection {
    fn default() -> Self {
        Self {
            debounce_ms: 300,
            batch_ms: 100,
        }
    }
}

impl StoreConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| CoreError::io(path, e))?;
        toml::from_str(&content).map_err(|e| CoreError::Config(e.to_string()))
    }

    /// Render as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| CoreError::Config(e.to_string()))
    }
}

impl WatcherSection {
    /// Debounce window as a Duration
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Batch timeout as a Duration
    pub fn batch_timeout(&self) -> Duration {
        Duration::from_millis(self.batch_ms)
    }
}

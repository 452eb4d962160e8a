//! Journey data structures

use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One recorded shell invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JourneyStep {
    /// Raw command text, stored verbatim and never interpreted
    pub raw_command: String,
    /// Stdout captured during recording, if any
    pub captured_stdout: Option<String>,
    /// Exit status of the recorded execution
    pub exit_status: i32,
    /// When this step was recorded
    pub timestamp: DateTime<Utc>,
    /// Working directory at capture time
    #[serde(default)]
    pub working_dir: Option<PathBuf>,
}

impl JourneyStep {
    /// Create a step stamped with the current time and working directory
    pub fn capture(
        raw_command: impl Into<String>,
        captured_stdout: Option<String>,
        exit_status: i32,
    ) -> Self {
        Self {
            raw_command: raw_command.into(),
            captured_stdout,
            exit_status,
            timestamp: Utc::now(),
            working_dir: std::env::current_dir().ok(),
        }
    }
}

/// A named, ordered recording of shell commands
///
/// Steps preserve strict temporal order; replay invokes them in exactly
/// this order. Immutable once stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Journey {
    /// Unique name
    pub name: String,
    /// When the recording session began
    pub created_at: DateTime<Utc>,
    /// Ordered sequence of recorded steps
    pub steps: Vec<JourneyStep>,
}

impl Journey {
    /// Serialize for registry storage
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// Deserialize from registry storage
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(bytes)?)
    }
}

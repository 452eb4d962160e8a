//! Named project-state anchors
//!
//! An anchor is a named, persisted snapshot of a project's file tree,
//! optionally kept continuously current by a background watcher. This crate
//! provides the anchor record and registry, the [`AnchorManager`] with its
//! save/restore/diff/auto/stop lifecycle, and lossless export/import.

pub mod anchor;
pub mod error;
pub mod export;
pub mod manager;
pub mod registry;
pub mod tracker;

pub use anchor::{Anchor, AnchorSummary};
pub use error::{AnchorError, Result};
pub use export::{export_anchor, import_anchor};
pub use manager::{AnchorManager, RestoreFailure, RestoreReport, SaveOutcome};
pub use registry::AnchorRegistry;
pub use tracker::{TrackingOutcome, TrackingSession};

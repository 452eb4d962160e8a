//! Anchor data structures

use crate::error::Result;
use chrono::{DateTime, Utc};
use moor_core::FileTree;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// A named, persisted snapshot of a project's file tree
///
/// The `file_tree` reflects either the exact state at save time or, while
/// `tracked`, the most recent state forwarded by the watcher. The record is
/// replaced wholesale by a new `save` under the same name and mutated only
/// by the owning tracking loop while tracked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Anchor {
    /// Unique name
    pub name: String,
    /// When this version of the anchor was saved
    pub created_at: DateTime<Utc>,
    /// Ordered mapping of relative path to content hash + metadata
    pub file_tree: FileTree,
    /// Whether a background watcher keeps this anchor current
    pub tracked: bool,
    /// Handle of the owning tracking session, if any
    pub tracking_session: Option<Ulid>,
}

impl Anchor {
    /// Create a new untracked anchor from a snapshot
    pub fn new(name: impl Into<String>, file_tree: FileTree) -> Self {
        Self {
            name: name.into(),
            created_at: Utc::now(),
            file_tree,
            tracked: false,
            tracking_session: None,
        }
    }

    /// Approximate snapshot size (sum of file sizes)
    pub fn approx_size(&self) -> u64 {
        self.file_tree.total_size()
    }

    /// Summary row for listings
    pub fn summary(&self) -> AnchorSummary {
        AnchorSummary {
            name: self.name.clone(),
            created_at: self.created_at,
            tracked: self.tracked,
            file_count: self.file_tree.len(),
            approx_size: self.approx_size(),
        }
    }

    /// Serialize for registry storage
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// Deserialize from registry storage
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(bytes)?)
    }
}

/// Listing row for an anchor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnchorSummary {
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub tracked: bool,
    pub file_count: usize,
    pub approx_size: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use moor_core::{hash_bytes, FileEntry};

    fn sample_tree() -> FileTree {
        let mut tree = FileTree::new();
        tree.insert(
            "src/main.rs",
            FileEntry::new(hash_bytes(b"fn main() {}"), 12, 0o644, 1_700_000_000_000),
        );
        tree.insert(
            "Cargo.toml",
            FileEntry::new(hash_bytes(b"[package]"), 9, 0o644, 1_700_000_000_000),
        );
        tree
    }

    #[test]
    fn test_new_anchor_untracked() {
        let anchor = Anchor::new("baseline", sample_tree());
        assert_eq!(anchor.name, "baseline");
        assert!(!anchor.tracked);
        assert!(anchor.tracking_session.is_none());
        assert_eq!(anchor.file_tree.len(), 2);
    }

    #[test]
    fn test_approx_size() {
        let anchor = Anchor::new("a", sample_tree());
        assert_eq!(anchor.approx_size(), 21);
    }

    #[test]
    fn test_summary() {
        let anchor = Anchor::new("a", sample_tree());
        let summary = anchor.summary();
        assert_eq!(summary.name, "a");
        assert_eq!(summary.file_count, 2);
        assert_eq!(summary.approx_size, 21);
        assert!(!summary.tracked);
    }

    #[test]
    fn test_bincode_roundtrip() {
        let mut anchor = Anchor::new("roundtrip", sample_tree());
        anchor.tracked = true;
        anchor.tracking_session = Some(Ulid::new());

        let bytes = anchor.to_bytes().unwrap();
        let back = Anchor::from_bytes(&bytes).unwrap();

        assert_eq!(anchor.name, back.name);
        assert_eq!(anchor.created_at, back.created_at);
        assert_eq!(anchor.file_tree, back.file_tree);
        assert_eq!(anchor.tracked, back.tracked);
        assert_eq!(anchor.tracking_session, back.tracking_session);
    }
}

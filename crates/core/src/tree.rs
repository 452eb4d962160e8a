//! Ordered file trees for project snapshots

use crate::hash::ContentHash;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Metadata and content reference for one file in a tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    /// Hash of the blob containing this file's content
    pub hash: ContentHash,
    /// File size in bytes
    pub size: u64,
    /// Unix permission bits
    pub mode: u32,
    /// Modification time (Unix milliseconds)
    pub mtime_ms: u64,
}

impl FileEntry {
    /// Create a new file entry
    pub fn new(hash: ContentHash, size: u64, mode: u32, mtime_ms: u64) -> Self {
        Self {
            hash,
            size,
            mode,
            mtime_ms,
        }
    }
}

/// An ordered mapping from relative path to file entry
///
/// Backed by a BTreeMap so iteration follows the total lexicographic path
/// order the differ relies on. Paths differing only in case or trailing
/// separators are distinct keys; no normalization happens here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileTree {
    entries: BTreeMap<PathBuf, FileEntry>,
}

impl FileTree {
    /// Create a new empty tree
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Insert or replace an entry
    pub fn insert(&mut self, path: impl Into<PathBuf>, entry: FileEntry) {
        self.entries.insert(path.into(), entry);
    }

    /// Get an entry by path
    pub fn get(&self, path: &Path) -> Option<&FileEntry> {
        self.entries.get(path)
    }

    /// Remove an entry, returning it if present
    pub fn remove(&mut self, path: &Path) -> Option<FileEntry> {
        self.entries.remove(path)
    }

    /// Check whether a path is present
    pub fn contains(&self, path: &Path) -> bool {
        self.entries.contains_key(path)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the tree is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in path order
    pub fn iter(&self) -> impl Iterator<Item = (&PathBuf, &FileEntry)> {
        self.entries.iter()
    }

    /// Iterate paths in order
    pub fn paths(&self) -> impl Iterator<Item = &PathBuf> {
        self.entries.keys()
    }

    /// Sum of entry sizes (approximate snapshot size)
    pub fn total_size(&self) -> u64 {
        self.entries.values().map(|e| e.size).sum()
    }
}

impl FromIterator<(PathBuf, FileEntry)> for FileTree {
    fn from_iter<I: IntoIterator<Item = (PathBuf, FileEntry)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

//! Deterministic diffing between two file trees

use crate::hash::ContentHash;
use crate::tree::FileTree;
use std::cmp::Ordering;
use std::path::PathBuf;

/// A path whose content hash changed between two trees
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Modified {
    pub path: PathBuf,
    pub old_hash: ContentHash,
    pub new_hash: ContentHash,
}

/// A path that could not be read during enumeration, with its cause
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unreadable {
    pub path: PathBuf,
    pub cause: String,
}

impl Unreadable {
    pub fn new(path: impl Into<PathBuf>, cause: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            cause: cause.into(),
        }
    }
}

/// Result of diffing two trees
///
/// Transient value; computed on demand and never persisted.
#[derive(Debug, Clone, Default)]
pub struct DiffResult {
    /// Paths present in the new tree only
    pub added: Vec<PathBuf>,
    /// Paths present in the old tree only
    pub removed: Vec<PathBuf>,
    /// Paths present in both with differing content hashes
    pub modified: Vec<Modified>,
    /// Paths that could not be read, reported instead of aborting
    pub unreadable: Vec<Unreadable>,
}

impl DiffResult {
    /// True when no additions, removals, or modifications were found
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.modified.is_empty()
    }

    /// Total number of changed paths
    pub fn change_count(&self) -> usize {
        self.added.len() + self.removed.len() + self.modified.len()
    }

    /// Attach unreadable paths collected during enumeration
    pub fn with_unreadable(mut self, unreadable: Vec<Unreadable>) -> Self {
        self.unreadable.extend(unreadable);
        self
    }
}

/// Compute the diff between two trees
///
/// Both trees iterate in sorted path order, so a single two-cursor merge
/// produces the result in O(n) over the combined path count. Output vectors
/// come out path-sorted, which keeps display and tests deterministic.
pub fn diff(old: &FileTree, new: &FileTree) -> DiffResult {
    let mut result = DiffResult::default();

    let mut old_iter = old.iter().peekable();
    let mut new_iter = new.iter().peekable();

    loop {
        match (old_iter.peek(), new_iter.peek()) {
            (Some((old_path, old_entry)), Some((new_path, new_entry))) => {
                match old_path.cmp(new_path) {
                    Ordering::Less => {
                        result.removed.push((*old_path).clone());
                        old_iter.next();
                    }
                    Ordering::Greater => {
                        result.added.push((*new_path).clone());
                        new_iter.next();
                    }
                    Ordering::Equal => {
                        if old_entry.hash != new_entry.hash {
                            result.modified.push(Modified {
                                path: (*old_path).clone(),
                                old_hash: old_entry.hash,
                                new_hash: new_entry.hash,
                            });
                        }
                        old_iter.next();
                        new_iter.next();
                    }
                }
            }
            (Some((old_path, _)), None) => {
                result.removed.push((*old_path).clone());
                old_iter.next();
            }
            (None, Some((new_path, _))) => {
                result.added.push((*new_path).clone());
                new_iter.next();
            }
            (None, None) => break,
        }
    }

    result
}

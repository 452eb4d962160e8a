//! Project tree enumeration

use crate::diff::Unreadable;
use crate::error::{CoreError, Result};
use crate::store::should_ignore;
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// One enumerated file with its metadata
#[derive(Debug, Clone)]
pub struct ScanEntry {
    /// Path relative to the scanned root
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
    /// Unix permission bits
    pub mode: u32,
    /// Modification time (Unix milliseconds)
    pub mtime_ms: u64,
}

/// Result of enumerating a tree
///
/// Unreadable paths are collected with their causes instead of failing the
/// whole enumeration.
#[derive(Debug, Default)]
pub struct ScanOutcome {
    /// Readable files, sorted by path
    pub entries: Vec<ScanEntry>,
    /// Paths that could not be read
    pub unreadable: Vec<Unreadable>,
}

/// Permission bits from file metadata
pub fn file_mode(metadata: &Metadata) -> u32 {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        metadata.permissions().mode()
    }
    #[cfg(not(unix))]
    {
        if metadata.permissions().readonly() {
            0o444
        } else {
            0o644
        }
    }
}

/// Modification time as Unix milliseconds (0 if unavailable)
pub fn mtime_millis(metadata: &Metadata) -> u64 {
    metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Enumerate all files under a root, in path order
///
/// `.moor/` and `.git/` are excluded. Symlinks are not followed and only
/// regular files are reported.
pub fn enumerate(root: &Path) -> Result<ScanOutcome> {
    if !root.is_dir() {
        return Err(CoreError::io(
            root,
            std::io::Error::new(std::io::ErrorKind::NotFound, "root is not a directory"),
        ));
    }

    let mut outcome = ScanOutcome::default();

    let walker = WalkDir::new(root).follow_links(false).into_iter();
    for item in walker.filter_entry(|e| {
        e.path()
            .strip_prefix(root)
            .map(|rel| !should_ignore(rel))
            .unwrap_or(true)
    }) {
        let entry = match item {
            Ok(entry) => entry,
            Err(e) => {
                let path = e
                    .path()
                    .map(|p| p.strip_prefix(root).unwrap_or(p).to_path_buf())
                    .unwrap_or_else(|| root.to_path_buf());
                outcome.unreadable.push(Unreadable::new(path, e.to_string()));
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let rel = match entry.path().strip_prefix(root) {
            Ok(rel) => rel.to_path_buf(),
            Err(_) => continue,
        };

        match entry.metadata() {
            Ok(metadata) => outcome.entries.push(ScanEntry {
                path: rel,
                size: metadata.len(),
                mode: file_mode(&metadata),
                mtime_ms: mtime_millis(&metadata),
            }),
            Err(e) => outcome.unreadable.push(Unreadable::new(rel, e.to_string())),
        }
    }

    outcome.entries.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(outcome)
}

//! Anchor lifecycle: save, restore, list, show, diff, auto-track, stop

use crate::anchor::{Anchor, AnchorSummary};
use crate::error::{AnchorError, Result};
use crate::registry::AnchorRegistry;
use crate::tracker::{self, TrackerCtx, TrackingOutcome, TrackingSession};
use chrono::Utc;
use dashmap::DashMap;
use moor_core::diff::{diff, DiffResult, Unreadable};
use moor_core::{enumerate, hash_path, FileEntry, FileTree, Store};
use moor_watcher::WatcherConfig;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use ulid::Ulid;

/// One path that restore could not reconcile, with its cause
#[derive(Debug, Clone)]
pub struct RestoreFailure {
    pub path: PathBuf,
    pub cause: String,
}

/// Outcome of a restore, enumerating every failing path
#[derive(Debug, Clone, Default)]
pub struct RestoreReport {
    /// Files overwritten from stored blobs
    pub restored: u64,
    /// Live files deleted because the anchor does not contain them
    pub deleted: u64,
    /// Files left untouched because their content already matched
    pub unchanged: u64,
    /// Per-path failures; restore continues past each one
    pub failures: Vec<RestoreFailure>,
}

/// Outcome of a save
#[derive(Debug)]
pub struct SaveOutcome {
    pub anchor: Anchor,
    /// Paths skipped because they could not be read
    pub unreadable: Vec<Unreadable>,
}

/// Guard for exclusive access to one anchor's file_tree
///
/// Held internally by every manual operation and by the tracking loop for
/// the duration of each event batch.
pub struct AnchorLock {
    _guard: tokio::sync::OwnedMutexGuard<()>,
}

/// Owns the lifecycle of named anchors
///
/// Constructed against an explicit [`Store`]; holds no process-wide state,
/// so multiple managers over different stores coexist in one process.
pub struct AnchorManager {
    root: PathBuf,
    store: Arc<Store>,
    registry: Arc<AnchorRegistry>,
    guards: DashMap<String, Arc<Mutex<()>>>,
    sessions: DashMap<String, Arc<TrackingSession>>,
}

impl AnchorManager {
    /// Create a manager over an open store
    pub fn new(store: Arc<Store>) -> Result<Self> {
        let registry = Arc::new(AnchorRegistry::open(&store.anchors_db())?);
        Ok(Self {
            root: store.root().to_path_buf(),
            store,
            registry,
            guards: DashMap::new(),
            sessions: DashMap::new(),
        })
    }

    /// The underlying registry (used by export/import and listings)
    pub fn registry(&self) -> &AnchorRegistry {
        &self.registry
    }

    fn guard(&self, name: &str) -> Arc<Mutex<()>> {
        self.guards
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Acquire exclusive access to an anchor
    ///
    /// With `wait`, blocks until any in-flight tracking batch has been
    /// applied. Without it, fails immediately with [`AnchorError::Busy`]
    /// when the anchor is held.
    pub async fn lock_anchor(&self, name: &str, wait: bool) -> Result<AnchorLock> {
        let guard = self.guard(name);
        let owned = if wait {
            guard.lock_owned().await
        } else {
            guard
                .try_lock_owned()
                .map_err(|_| AnchorError::Busy(name.to_string()))?
        };
        Ok(AnchorLock { _guard: owned })
    }

    /// Snapshot the project tree and store it under `name`
    ///
    /// Replaces any prior anchor of that name wholesale. Re-saving an
    /// unchanged tree yields an identical file_tree; `created_at` still
    /// advances.
    pub async fn save(&self, name: &str) -> Result<SaveOutcome> {
        let _lock = self.lock_anchor(name, true).await?;

        let (file_tree, unreadable) = self.snapshot_tree()?;
        for skipped in &unreadable {
            tracing::warn!(
                "save of '{name}' skipped unreadable {}: {}",
                skipped.path.display(),
                skipped.cause
            );
        }

        let previous = self.registry.get(name)?;
        let anchor = Anchor {
            name: name.to_string(),
            created_at: Utc::now(),
            file_tree,
            tracked: previous.as_ref().map(|a| a.tracked).unwrap_or(false),
            tracking_session: previous.and_then(|a| a.tracking_session),
        };
        self.registry.put(&anchor)?;

        tracing::info!(
            "saved anchor '{name}' ({} files, {} bytes)",
            anchor.file_tree.len(),
            anchor.approx_size()
        );

        Ok(SaveOutcome { anchor, unreadable })
    }

    /// Restore the live tree to an anchor's recorded state
    ///
    /// Overwrites files whose content differs, deletes live files absent
    /// from the anchor, and leaves matching files untouched. Per-file
    /// failures do not abort the operation; they are collected and the call
    /// fails at the end with the full report.
    pub async fn restore(&self, name: &str, wait: bool) -> Result<RestoreReport> {
        let _lock = self.lock_anchor(name, wait).await?;

        let anchor = self
            .registry
            .get(name)?
            .ok_or_else(|| AnchorError::NotFound(name.to_string()))?;

        let mut report = RestoreReport::default();
        let live = enumerate(&self.root)?;

        // Apply stored entries over the live tree
        for (path, entry) in anchor.file_tree.iter() {
            let abs = self.root.join(path);

            let already_matches = abs.is_file()
                && hash_path(&abs).map(|h| h == entry.hash).unwrap_or(false);
            if already_matches {
                report.unchanged += 1;
                continue;
            }

            let content = match self.store.blobs().read(entry.hash) {
                Ok(content) => content,
                Err(e) => {
                    report.failures.push(RestoreFailure {
                        path: path.clone(),
                        cause: e.to_string(),
                    });
                    continue;
                }
            };

            if let Err(e) = write_restored(&abs, &content, entry) {
                report.failures.push(RestoreFailure {
                    path: path.clone(),
                    cause: e.to_string(),
                });
                continue;
            }
            report.restored += 1;
        }

        // Delete live files the anchor does not contain
        for scan_entry in &live.entries {
            if anchor.file_tree.contains(&scan_entry.path) {
                continue;
            }
            let abs = self.root.join(&scan_entry.path);
            match std::fs::remove_file(&abs) {
                Ok(()) => report.deleted += 1,
                Err(e) => report.failures.push(RestoreFailure {
                    path: scan_entry.path.clone(),
                    cause: e.to_string(),
                }),
            }
        }

        // Paths enumeration could not read were never reconciled
        for unreadable in live.unreadable {
            report.failures.push(RestoreFailure {
                path: unreadable.path,
                cause: unreadable.cause,
            });
        }

        if report.failures.is_empty() {
            tracing::info!(
                "restored anchor '{name}' ({} written, {} deleted, {} unchanged)",
                report.restored,
                report.deleted,
                report.unchanged
            );
            Ok(report)
        } else {
            Err(AnchorError::RestoreFailed {
                name: name.to_string(),
                report,
            })
        }
    }

    /// All anchors, newest first
    pub fn list(&self) -> Result<Vec<AnchorSummary>> {
        self.registry.list()
    }

    /// Load one anchor record
    pub fn get(&self, name: &str) -> Result<Anchor> {
        self.registry
            .get(name)?
            .ok_or_else(|| AnchorError::NotFound(name.to_string()))
    }

    /// Diff an anchor's stored tree against the current live tree
    pub async fn diff(&self, name: &str) -> Result<DiffResult> {
        let _lock = self.lock_anchor(name, true).await?;

        let anchor = self
            .registry
            .get(name)?
            .ok_or_else(|| AnchorError::NotFound(name.to_string()))?;

        let (live_tree, unreadable) = self.live_tree()?;
        Ok(diff(&anchor.file_tree, &live_tree).with_unreadable(unreadable))
    }

    /// Delete an anchor
    ///
    /// Tracked anchors must be stopped first.
    pub async fn remove(&self, name: &str) -> Result<()> {
        if self.is_tracking(name) {
            return Err(AnchorError::Busy(name.to_string()));
        }
        let _lock = self.lock_anchor(name, true).await?;
        if !self.registry.remove(name)? {
            return Err(AnchorError::NotFound(name.to_string()));
        }
        Ok(())
    }

    /// Start tracking an anchor: watch the project root and keep the
    /// anchor's file_tree current with every delivered change
    ///
    /// Returns once tracking has started; the consumption loop runs on its
    /// own task. Calling `auto` on an anchor that is already tracking is a
    /// no-op reporting the existing session handle.
    pub async fn auto(&self, name: &str) -> Result<Ulid> {
        if let Some(session) = self.sessions.get(name) {
            if !session.is_finished() {
                return Ok(session.id());
            }
        }
        self.sessions.remove(name);

        // Hold the guard across spawn + persist so the loop's first batch
        // cannot interleave with the tracked-flag update.
        let guard = self.guard(name);
        let _lock = guard.clone().lock_owned().await;

        let mut anchor = self.get(name)?;

        let config = WatcherConfig::with_debounce(self.store.config().watcher.debounce());
        let ctx = TrackerCtx {
            name: name.to_string(),
            root: self.root.clone(),
            store: Arc::clone(&self.store),
            registry: Arc::clone(&self.registry),
            guard,
        };

        let session = Arc::new(tracker::spawn(ctx, config)?);

        anchor.tracked = true;
        anchor.tracking_session = Some(session.id());
        self.registry.put(&anchor)?;

        let id = session.id();
        self.sessions.insert(name.to_string(), session);
        tracing::info!("tracking anchor '{name}' (session {id})");
        Ok(id)
    }

    /// Stop tracking an anchor
    ///
    /// Blocks until the background loop has applied its final batch and
    /// exited; after this returns, no further mutation of the anchor
    /// happens. Returns whether a live session was actually stopped.
    pub async fn stop(&self, name: &str) -> Result<bool> {
        let session = match self.sessions.remove(name) {
            Some((_, session)) => session,
            None => {
                // No session in this process; clear a stale tracked flag
                let _lock = self.lock_anchor(name, true).await?;
                match self.registry.get(name)? {
                    Some(mut anchor) => {
                        if anchor.tracked {
                            anchor.tracked = false;
                            anchor.tracking_session = None;
                            self.registry.put(&anchor)?;
                        }
                        return Ok(false);
                    }
                    None => return Err(AnchorError::NotFound(name.to_string())),
                }
            }
        };

        session.request_stop();
        let outcome = session.wait().await;
        tracing::info!("stopped tracking '{name}': {outcome:?}");
        Ok(true)
    }

    /// Block until a tracking session ends on its own or via `stop`
    ///
    /// Surfaces an unexpected watcher death as `WatcherTerminated`.
    pub async fn wait(&self, name: &str) -> Result<()> {
        let session = match self.sessions.get(name) {
            Some(session) => Arc::clone(&session),
            None => return Ok(()),
        };
        match session.wait().await {
            TrackingOutcome::Terminated(reason) => Err(AnchorError::WatcherTerminated(reason)),
            _ => Ok(()),
        }
    }

    /// Whether a live tracking session exists for this anchor
    pub fn is_tracking(&self, name: &str) -> bool {
        self.sessions
            .get(name)
            .map(|s| !s.is_finished())
            .unwrap_or(false)
    }

    /// Enumerate + hash the project tree, persisting blobs
    fn snapshot_tree(&self) -> Result<(FileTree, Vec<Unreadable>)> {
        let scan = enumerate(&self.root)?;
        let mut tree = FileTree::new();
        let mut unreadable = scan.unreadable;

        for entry in scan.entries {
            let abs = self.root.join(&entry.path);
            match self.store.blobs().write_file(&abs) {
                Ok(hash) => tree.insert(
                    entry.path,
                    FileEntry::new(hash, entry.size, entry.mode, entry.mtime_ms),
                ),
                // Files can vanish between enumeration and hashing
                Err(e) => unreadable.push(Unreadable::new(entry.path, e.to_string())),
            }
        }

        Ok((tree, unreadable))
    }

    /// Enumerate + hash the project tree without writing blobs
    fn live_tree(&self) -> Result<(FileTree, Vec<Unreadable>)> {
        let scan = enumerate(&self.root)?;
        let mut tree = FileTree::new();
        let mut unreadable = scan.unreadable;

        for entry in scan.entries {
            let abs = self.root.join(&entry.path);
            match hash_path(&abs) {
                Ok(hash) => tree.insert(
                    entry.path,
                    FileEntry::new(hash, entry.size, entry.mode, entry.mtime_ms),
                ),
                Err(e) => unreadable.push(Unreadable::new(entry.path, e.to_string())),
            }
        }

        Ok((tree, unreadable))
    }
}

/// Write one restored file: parents, content, permissions
fn write_restored(
    abs: &std::path::Path,
    content: &[u8],
    entry: &FileEntry,
) -> std::io::Result<()> {
    if let Some(parent) = abs.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(abs, content)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        // Permission restoration is best effort; content already landed
        let _ = std::fs::set_permissions(abs, std::fs::Permissions::from_mode(entry.mode));
    }

    Ok(())
}

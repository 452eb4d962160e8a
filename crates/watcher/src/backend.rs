//! OS change-notification backend
//!
//! Wraps the `notify` recommended watcher (inotify on Linux, FSEvents on
//! macOS) behind a crossbeam channel so the async pump can poll it without
//! blocking, and converts raw notify events into [`ChangeEvent`]s.

use crate::{ChangeEvent, ChangeKind, Result};
use crossbeam_channel::{Receiver, TryRecvError};
use notify::{EventKind as NotifyKind, RecommendedWatcher, RecursiveMode, Watcher as _};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Live backend: the notify watcher plus its event channel
pub struct Backend {
    /// Kept alive for the duration of the watch; dropping it stops notify
    _watcher: RecommendedWatcher,
    rx: Receiver<notify::Result<notify::Event>>,
}

impl Backend {
    /// Create and start a recursive watcher on the root
    pub fn spawn(root: &Path) -> Result<Self> {
        let (tx, rx) = crossbeam_channel::unbounded();

        let mut watcher = notify::recommended_watcher(move |event| {
            let _ = tx.send(event);
        })?;
        watcher.watch(root, RecursiveMode::Recursive)?;

        Ok(Self {
            _watcher: watcher,
            rx,
        })
    }

    /// Non-blocking receive
    ///
    /// `None` means no event is queued right now; a disconnected channel is
    /// surfaced as an error so the pump can terminate the stream.
    pub fn try_recv(&self) -> Option<notify::Result<notify::Event>> {
        match self.rx.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(notify::Error::generic(
                "backend event channel disconnected",
            ))),
        }
    }
}

/// Converts raw notify events to root-relative change events
pub struct EventConverter {
    root: PathBuf,
    ignore_prefixes: Vec<PathBuf>,
}

impl EventConverter {
    pub fn new(root: PathBuf, ignore_prefixes: Vec<PathBuf>) -> Self {
        Self {
            root,
            ignore_prefixes,
        }
    }

    /// Convert one notify event into zero or more change events
    ///
    /// Directory events and events under ignored prefixes are dropped.
    /// Rename legs are resolved by existence: the path either reappears
    /// (Created) or is gone (Removed).
    pub fn convert(&self, event: notify::Event) -> Vec<ChangeEvent> {
        let mut changes = Vec::new();

        for path in &event.paths {
            let rel = match path.strip_prefix(&self.root) {
                Ok(rel) if !rel.as_os_str().is_empty() => rel.to_path_buf(),
                _ => continue,
            };

            if self.is_ignored(&rel) {
                continue;
            }

            let kind = match &event.kind {
                NotifyKind::Create(_) => ChangeKind::Created,
                NotifyKind::Remove(_) => ChangeKind::Removed,
                NotifyKind::Modify(notify::event::ModifyKind::Name(_)) => {
                    if path.exists() {
                        ChangeKind::Created
                    } else {
                        ChangeKind::Removed
                    }
                }
                NotifyKind::Modify(_) => ChangeKind::Modified,
                NotifyKind::Access(_) => continue,
                NotifyKind::Any | NotifyKind::Other => ChangeKind::Modified,
            };

            // Only files belong in a file tree; skip live directories.
            if kind != ChangeKind::Removed && path.is_dir() {
                continue;
            }

            changes.push(ChangeEvent::new(Arc::from(rel.as_path()), kind));
        }

        changes
    }

    fn is_ignored(&self, rel: &Path) -> bool {
        self.ignore_prefixes
            .iter()
            .any(|prefix| rel.starts_with(prefix))
    }
}

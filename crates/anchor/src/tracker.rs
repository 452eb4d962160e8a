//! Background tracking loop for anchors
//!
//! One loop per tracked anchor consumes the watcher stream, re-hashes only
//! the affected paths, and updates the anchor's file_tree in place. The
//! per-anchor guard is held for the duration of each batch, so manual
//! operations never interleave with a half-applied batch.

use crate::error::Result;
use crate::registry::AnchorRegistry;
use moor_core::scan::{file_mode, mtime_millis};
use moor_core::{FileEntry, Store};
use moor_watcher::{self as watcher, ChangeEvent, WatchHandle, WatchMessage, WatcherConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{mpsc, watch, Mutex};
use ulid::Ulid;

/// How a tracking session ended (or that it has not)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackingOutcome {
    /// Loop is alive and consuming events
    Running,
    /// Ended by an explicit stop, all pending events applied
    Stopped,
    /// Background monitor died (e.g. watched root removed)
    Terminated(String),
}

/// Handle to a live tracking loop
pub struct TrackingSession {
    id: Ulid,
    shutdown_tx: watch::Sender<bool>,
    outcome_rx: watch::Receiver<TrackingOutcome>,
}

impl TrackingSession {
    /// Session handle identifier
    pub fn id(&self) -> Ulid {
        self.id
    }

    /// Whether the loop has exited
    pub fn is_finished(&self) -> bool {
        *self.outcome_rx.borrow() != TrackingOutcome::Running
    }

    /// Current outcome
    pub fn outcome(&self) -> TrackingOutcome {
        self.outcome_rx.borrow().clone()
    }

    /// Ask the loop to shut down; it drains pending events first
    pub(crate) fn request_stop(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// Wait until the loop has fully exited
    ///
    /// Returning guarantees no further mutation of the anchor by this
    /// session: the outcome is published only after the final batch has
    /// been applied and the record persisted.
    pub async fn wait(&self) -> TrackingOutcome {
        let mut rx = self.outcome_rx.clone();
        loop {
            let current = rx.borrow().clone();
            if current != TrackingOutcome::Running {
                return current;
            }
            if rx.changed().await.is_err() {
                return rx.borrow().clone();
            }
        }
    }
}

/// Everything the loop needs, cloned out of the manager
pub(crate) struct TrackerCtx {
    pub name: String,
    pub root: PathBuf,
    pub store: Arc<Store>,
    pub registry: Arc<AnchorRegistry>,
    pub guard: Arc<Mutex<()>>,
}

/// Start a watcher and the consumption loop for one anchor
pub(crate) fn spawn(ctx: TrackerCtx, config: WatcherConfig) -> Result<TrackingSession> {
    let (handle, stream) = watcher::start(&ctx.root, config)?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (outcome_tx, outcome_rx) = watch::channel(TrackingOutcome::Running);
    let id = Ulid::new();

    tokio::spawn(run_loop(ctx, handle, stream, shutdown_rx, outcome_tx));

    Ok(TrackingSession {
        id,
        shutdown_tx,
        outcome_rx,
    })
}

async fn run_loop(
    ctx: TrackerCtx,
    handle: WatchHandle,
    mut stream: mpsc::UnboundedReceiver<WatchMessage>,
    mut shutdown_rx: watch::Receiver<bool>,
    outcome_tx: watch::Sender<TrackingOutcome>,
) {
    tracing::info!(anchor = %ctx.name, "tracking started");
    let mut outcome = TrackingOutcome::Stopped;

    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => {
                // Stop the watcher; it flushes pending debounces into the
                // stream, which we drain and apply before acknowledging.
                handle.stop().await;

                let mut batch = Vec::new();
                while let Ok(msg) = stream.try_recv() {
                    if let WatchMessage::Change(event) = msg {
                        batch.push(event);
                    }
                }
                if !batch.is_empty() {
                    let _ = apply_batch(&ctx, &batch).await;
                }
                break;
            }

            msg = stream.recv() => {
                match msg {
                    None => {
                        outcome = TrackingOutcome::Terminated("event stream closed".to_string());
                        break;
                    }
                    Some(WatchMessage::Terminated(reason)) => {
                        tracing::error!(anchor = %ctx.name, "tracking lost its watcher: {reason}");
                        outcome = TrackingOutcome::Terminated(reason.to_string());
                        break;
                    }
                    Some(WatchMessage::Change(first)) => {
                        let mut batch = vec![first];
                        let mut terminated = None;
                        while let Ok(msg) = stream.try_recv() {
                            match msg {
                                WatchMessage::Change(event) => batch.push(event),
                                WatchMessage::Terminated(reason) => {
                                    terminated = Some(reason.to_string());
                                    break;
                                }
                            }
                        }

                        match apply_batch(&ctx, &batch).await {
                            Ok(true) => {}
                            Ok(false) => break, // anchor deleted underneath us
                            Err(e) => {
                                tracing::error!(anchor = %ctx.name, "batch application failed: {e}");
                            }
                        }

                        if let Some(reason) = terminated {
                            outcome = TrackingOutcome::Terminated(reason);
                            break;
                        }
                    }
                }
            }
        }
    }

    finalize(&ctx).await;
    tracing::info!(anchor = %ctx.name, "tracking ended: {outcome:?}");
    let _ = outcome_tx.send(outcome);
}

/// Apply one batch of change events to the anchor, in delivery order
///
/// Reloads the record under the guard so a manual save issued between
/// batches is never clobbered by a stale in-memory copy. Returns false if
/// the anchor no longer exists.
async fn apply_batch(ctx: &TrackerCtx, batch: &[ChangeEvent]) -> Result<bool> {
    let _guard = ctx.guard.lock().await;

    let mut anchor = match ctx.registry.get(&ctx.name)? {
        Some(anchor) => anchor,
        None => {
            tracing::warn!(anchor = %ctx.name, "anchor deleted while tracked");
            return Ok(false);
        }
    };

    for event in batch {
        let rel = event.path.as_ref();
        let abs = ctx.root.join(rel);

        match std::fs::symlink_metadata(&abs) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                anchor.file_tree.remove(rel);
            }
            Err(e) => {
                // Per-path failures are reported, not fatal to the batch
                tracing::warn!(anchor = %ctx.name, "cannot stat {}: {e}", rel.display());
            }
            Ok(metadata) if metadata.is_file() => {
                match ctx.store.blobs().write_file(&abs) {
                    Ok(hash) => {
                        anchor.file_tree.insert(
                            rel.to_path_buf(),
                            FileEntry::new(
                                hash,
                                metadata.len(),
                                file_mode(&metadata),
                                mtime_millis(&metadata),
                            ),
                        );
                    }
                    Err(e) => {
                        tracing::warn!(anchor = %ctx.name, "cannot snapshot {}: {e}", rel.display());
                    }
                }
            }
            Ok(_) => {} // directories and symlinks are not tree entries
        }
    }

    ctx.registry.put(&anchor)?;
    tracing::debug!(anchor = %ctx.name, "applied batch of {} event(s)", batch.len());

    Ok(true)
}

/// Persist the untracked state once the loop is done
async fn finalize(ctx: &TrackerCtx) {
    let _guard = ctx.guard.lock().await;

    match ctx.registry.get(&ctx.name) {
        Ok(Some(mut anchor)) => {
            anchor.tracked = false;
            anchor.tracking_session = None;
            if let Err(e) = ctx.registry.put(&anchor) {
                tracing::error!(anchor = %ctx.name, "failed to persist untracked state: {e}");
            }
        }
        Ok(None) => {}
        Err(e) => {
            tracing::error!(anchor = %ctx.name, "failed to load anchor during shutdown: {e}");
        }
    }
}

//! Filesystem watching for moor
//!
//! Produces a lazy, unbounded stream of debounced change events for a
//! directory tree. Events for the same path arrive in the order the
//! filesystem reported them; no ordering is promised across unrelated paths.
//! Rapid repeated changes to one path within the debounce window collapse
//! into a single event carrying the final coalesced kind.
//!
//! A stream is infinite until [`WatchHandle::stop`] is called and is not
//! restartable; a new [`start`] yields a new stream. If the watched root is
//! deleted, or the OS backend fails, the stream ends with a terminal
//! [`WatchMessage::Terminated`] instead of blocking forever.

pub mod backend;
pub mod debounce;

use debounce::Debouncer;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, watch};

/// Result type for watcher operations
pub type Result<T> = std::result::Result<T, WatcherError>;

/// Errors raised while starting a watcher
#[derive(Debug, Error)]
pub enum WatcherError {
    /// OS change-notification backend failed to initialize
    #[error("failed to initialize filesystem watcher: {0}")]
    Init(#[from] notify::Error),

    /// Watched root does not exist
    #[error("watch root does not exist: {}", .0.display())]
    MissingRoot(PathBuf),
}

/// Kind of filesystem change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// Path appeared
    Created,
    /// Path content or metadata changed
    Modified,
    /// Path disappeared
    Removed,
}

/// A debounced change to a single path, relative to the watched root
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    pub path: Arc<Path>,
    pub kind: ChangeKind,
}

impl ChangeEvent {
    pub fn new(path: Arc<Path>, kind: ChangeKind) -> Self {
        Self { path, kind }
    }
}

/// Why a stream ended on its own
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminationReason {
    /// The watched root was deleted while active
    RootRemoved,
    /// The OS backend died or its channel closed
    Backend(String),
}

impl std::fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RootRemoved => write!(f, "watched root was removed"),
            Self::Backend(msg) => write!(f, "watch backend failed: {msg}"),
        }
    }
}

/// Message delivered on the event stream
#[derive(Debug, Clone)]
pub enum WatchMessage {
    /// A debounced change
    Change(ChangeEvent),
    /// Terminal message; the stream closes after this
    Terminated(TerminationReason),
}

/// Watcher configuration
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// Per-path debounce window
    pub debounce: Duration,
    /// Relative path prefixes excluded from watching
    pub ignore_prefixes: Vec<PathBuf>,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(300),
            ignore_prefixes: vec![PathBuf::from(".moor"), PathBuf::from(".git")],
        }
    }
}

impl WatcherConfig {
    /// Config with a custom debounce window and default ignores
    pub fn with_debounce(debounce: Duration) -> Self {
        Self {
            debounce,
            ..Self::default()
        }
    }
}

/// Handle for an active watch; stopping consumes it
pub struct WatchHandle {
    stop_tx: watch::Sender<bool>,
    task: tokio::task::JoinHandle<()>,
}

impl WatchHandle {
    /// Stop the watch
    ///
    /// Pending debounced events are flushed into the stream before it
    /// closes, so a consumer can drain them after `stop` returns.
    pub async fn stop(self) {
        let _ = self.stop_tx.send(true);
        let _ = self.task.await;
    }
}

/// How often the pump polls the backend channel and the root's existence
const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Start watching a directory tree
///
/// Returns a handle and the receiving end of the event stream. Must be
/// called from within a tokio runtime.
pub fn start(
    root: &Path,
    config: WatcherConfig,
) -> Result<(WatchHandle, mpsc::UnboundedReceiver<WatchMessage>)> {
    // Canonicalize so notify's absolute event paths strip cleanly even when
    // the caller handed us a symlinked root.
    let root = root
        .canonicalize()
        .map_err(|_| WatcherError::MissingRoot(root.to_path_buf()))?;
    if !root.is_dir() {
        return Err(WatcherError::MissingRoot(root));
    }

    let backend = backend::Backend::spawn(&root)?;
    let converter = backend::EventConverter::new(root.clone(), config.ignore_prefixes.clone());
    let (debouncer, debounced_rx) = Debouncer::new(config.debounce);
    let (out_tx, out_rx) = mpsc::unbounded_channel();
    let (stop_tx, stop_rx) = watch::channel(false);
    let task = tokio::spawn(pump(root, backend, converter, debouncer, debounced_rx, out_tx, stop_rx));

    Ok((WatchHandle { stop_tx, task }, out_rx))
}

/// Event pump: backend -> convert -> debounce -> stream
async fn pump(
    root: PathBuf,
    backend: backend::Backend,
    converter: backend::EventConverter,
    debouncer: Debouncer,
    mut debounced_rx: mpsc::UnboundedReceiver<ChangeEvent>,
    out_tx: mpsc::UnboundedSender<WatchMessage>,
    mut stop_rx: watch::Receiver<bool>,
) {
    let mut poll = tokio::time::interval(POLL_INTERVAL);
    poll.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = stop_rx.changed() => {
                // Drain whatever the backend already reported, then flush
                // pending debounces into the stream before closing it.
                let _ = drain_backend(&backend, &converter, &debouncer);
                for event in debouncer.flush() {
                    let _ = out_tx.send(WatchMessage::Change(event));
                }
                while let Ok(event) = debounced_rx.try_recv() {
                    let _ = out_tx.send(WatchMessage::Change(event));
                }
                break;
            }

            ready = debounced_rx.recv() => {
                if let Some(event) = ready {
                    if out_tx.send(WatchMessage::Change(event)).is_err() {
                        break; // consumer gone
                    }
                }
            }

            _ = poll.tick() => {
                if !root.exists() {
                    tracing::warn!("watch root removed: {}", root.display());
                    let _ = out_tx.send(WatchMessage::Terminated(TerminationReason::RootRemoved));
                    break;
                }

                if let Err(reason) = drain_backend(&backend, &converter, &debouncer) {
                    tracing::error!("watch backend failure: {reason}");
                    let _ = out_tx.send(WatchMessage::Terminated(reason));
                    break;
                }
            }
        }
    }
}

/// Pull all currently queued backend events into the debouncer
fn drain_backend(
    backend: &backend::Backend,
    converter: &backend::EventConverter,
    debouncer: &Debouncer,
) -> std::result::Result<(), TerminationReason> {
    loop {
        match backend.try_recv() {
            Some(Ok(event)) => {
                for change in converter.convert(event) {
                    debouncer.push(change);
                }
            }
            Some(Err(e)) => return Err(TerminationReason::Backend(e.to_string())),
            None => return Ok(()),
        }
    }
}

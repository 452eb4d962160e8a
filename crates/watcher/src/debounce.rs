//! Per-path debouncing with event-kind coalescing
//!
//! Tracks one pending entry per path. Repeated events inside the window
//! reset the timer and fold into the pending kind, so a save storm on one
//! file emits a single event carrying the net effect. Opposing events
//! (create then remove) cancel each other and emit nothing.

use crate::{ChangeEvent, ChangeKind};
use dashmap::DashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

/// Pending debounce entry for one path
#[derive(Debug)]
struct Pending {
    event: ChangeEvent,
    deadline: Instant,
}

struct Shared {
    state: DashMap<PathBuf, Pending>,
    tx: mpsc::UnboundedSender<ChangeEvent>,
    window: Duration,
}

/// Per-path debouncer; push side
///
/// Emitted events arrive on the receiver returned by [`Debouncer::new`].
pub struct Debouncer {
    shared: Arc<Shared>,
}

impl Debouncer {
    /// Create a debouncer and the channel its emissions arrive on
    pub fn new(window: Duration) -> (Self, mpsc::UnboundedReceiver<ChangeEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                shared: Arc::new(Shared { state: DashMap::new(), tx, window }),
            },
            rx,
        )
    }

    /// Register an event, starting or resetting the path's window
    pub fn push(&self, event: ChangeEvent) {
        let path = event.path.to_path_buf();
        let deadline = Instant::now() + self.shared.window;

        if let Some(mut pending) = self.shared.state.get_mut(&path) {
            match fold_kinds(pending.event.kind, event.kind) {
                Some(kind) => {
                    pending.event = ChangeEvent::new(event.path, kind);
                    pending.deadline = deadline;
                }
                None => {
                    // Create followed by remove inside the window: nothing
                    // observable happened, drop the entry entirely.
                    drop(pending);
                    self.shared.state.remove(&path);
                }
            }
            return;
        }

        self.shared.state.insert(path.clone(), Pending { event, deadline });

        // One timer task per pending path; it re-arms itself while new
        // events keep pushing the deadline forward.
        let shared = Arc::clone(&self.shared);
        tokio::spawn(async move {
            let mut wake_at = deadline;
            loop {
                tokio::time::sleep_until(wake_at).await;

                let current = match shared.state.get(&path) {
                    Some(pending) => pending.deadline,
                    None => return, // cancelled or flushed
                };

                if Instant::now() >= current {
                    if let Some((_, pending)) = shared.state.remove(&path) {
                        let _ = shared.tx.send(pending.event);
                    }
                    return;
                }

                wake_at = current;
            }
        });
    }

    /// Number of paths currently in their debounce window
    pub fn pending_count(&self) -> usize {
        self.shared.state.len()
    }

    /// Force out everything currently pending
    ///
    /// Used on shutdown so no observed change is silently lost. The timer
    /// tasks find their entries gone and exit without emitting.
    pub fn flush(&self) -> Vec<ChangeEvent> {
        let paths: Vec<PathBuf> = self.shared.state.iter().map(|e| e.key().clone()).collect();
        let mut events = Vec::with_capacity(paths.len());
        for path in paths {
            if let Some((_, pending)) = self.shared.state.remove(&path) {
                events.push(pending.event);
            }
        }
        events
    }
}

/// Fold a new event kind into the pending one
///
/// `None` means the pair cancels out (created then removed).
fn fold_kinds(pending: ChangeKind, new: ChangeKind) -> Option<ChangeKind> {
    use ChangeKind::*;
    match (pending, new) {
        (Created, Removed) => None,
        (Created, _) => Some(Created),
        (Modified, Removed) => Some(Removed),
        (Modified, _) => Some(Modified),
        (Removed, Created) => Some(Modified),
        (Removed, Modified) => Some(Modified),
        (Removed, Removed) => Some(Removed),
    }
}

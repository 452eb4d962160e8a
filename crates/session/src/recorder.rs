//! Recording sessions: strictly sequential step accumulation

use crate::error::{Result, SessionError};
use crate::journey::{Journey, JourneyStep};
use crate::player::CommandExecutor;
use crate::registry::JourneyRegistry;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::io::BufRead;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Where recorded commands come from
///
/// End-of-input (`None`) is the stop signal, delivered through the same
/// abstraction used for reading commands, so the recorder never couples to
/// a particular terminal. On a real terminal that is Ctrl+D.
pub trait CommandSource {
    /// Next raw command line; `None` means end of input
    fn next_command(&mut self) -> std::io::Result<Option<String>>;
}

/// Reads commands line by line from stdin
pub struct StdinSource {
    reader: std::io::BufReader<std::io::Stdin>,
}

impl StdinSource {
    pub fn new() -> Self {
        Self {
            reader: std::io::BufReader::new(std::io::stdin()),
        }
    }
}

impl Default for StdinSource {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandSource for StdinSource {
    fn next_command(&mut self) -> std::io::Result<Option<String>> {
        let mut line = String::new();
        let bytes_read = self.reader.read_line(&mut line)?;
        if bytes_read == 0 {
            return Ok(None); // Ctrl+D
        }
        Ok(Some(line.trim_end_matches(['\n', '\r']).to_string()))
    }
}

/// An open recording session
///
/// Appends are strictly sequential: a contended `append` on the same handle
/// is rejected with `ConcurrentAccess` instead of being silently reordered.
pub struct RecordingHandle {
    name: String,
    created_at: DateTime<Utc>,
    steps: Mutex<Vec<JourneyStep>>,
    open: AtomicBool,
}

impl RecordingHandle {
    /// Append one captured invocation
    pub fn append(
        &self,
        raw_command: impl Into<String>,
        captured_stdout: Option<String>,
        exit_status: i32,
    ) -> Result<()> {
        if !self.open.load(Ordering::Acquire) {
            return Err(SessionError::RecordingClosed(self.name.clone()));
        }

        let mut steps = self
            .steps
            .try_lock()
            .ok_or_else(|| SessionError::ConcurrentAccess(self.name.clone()))?;
        steps.push(JourneyStep::capture(raw_command, captured_stdout, exit_status));
        Ok(())
    }

    /// Number of steps recorded so far
    pub fn len(&self) -> usize {
        self.steps.lock().len()
    }

    /// Whether anything has been recorded yet
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Recording name
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Creates and finalizes recording sessions
///
/// One recording can be active per recorder at a time; `begin` while
/// another session is open fails with `ConcurrentAccess`.
pub struct SessionRecorder {
    registry: Arc<JourneyRegistry>,
    active: Mutex<Option<String>>,
}

impl SessionRecorder {
    /// Create a recorder over a journey registry
    pub fn new(registry: Arc<JourneyRegistry>) -> Self {
        Self {
            registry,
            active: Mutex::new(None),
        }
    }

    /// Open a recording session under the given name
    pub fn begin(&self, name: &str) -> Result<RecordingHandle> {
        let mut active = self.active.lock();
        if let Some(current) = active.as_ref() {
            return Err(SessionError::ConcurrentAccess(format!(
                "already recording '{current}'"
            )));
        }
        *active = Some(name.to_string());

        tracing::info!("recording journey '{name}'");
        Ok(RecordingHandle {
            name: name.to_string(),
            created_at: Utc::now(),
            steps: Mutex::new(Vec::new()),
            open: AtomicBool::new(true),
        })
    }

    /// Close a recording session and persist the journey
    pub fn end(&self, handle: RecordingHandle) -> Result<Journey> {
        handle.open.store(false, Ordering::Release);

        let journey = Journey {
            name: handle.name.clone(),
            created_at: handle.created_at,
            steps: handle.steps.into_inner(),
        };
        self.registry.put(&journey)?;

        *self.active.lock() = None;
        tracing::info!(
            "recorded journey '{}' with {} step(s)",
            journey.name,
            journey.steps.len()
        );
        Ok(journey)
    }

    /// Abandon a recording session without persisting it
    pub fn abort(&self, handle: RecordingHandle) {
        handle.open.store(false, Ordering::Release);
        *self.active.lock() = None;
    }
}

/// Drive a full interactive recording session
///
/// Reads commands from the source, executes each through the collaborator
/// to capture its stdout and exit status, and appends it. Recording ends on
/// end-of-input or an explicit `stop`/`exit` command, never on a timeout.
/// `on_step` is called after each recorded step (for display).
pub fn record_session<F>(
    recorder: &SessionRecorder,
    name: &str,
    source: &mut dyn CommandSource,
    executor: &dyn CommandExecutor,
    mut on_step: F,
) -> Result<Journey>
where
    F: FnMut(&JourneyStep),
{
    let handle = recorder.begin(name)?;

    loop {
        let line = match source.next_command() {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                recorder.abort(handle);
                return Err(SessionError::io("<command source>", e));
            }
        };

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if trimmed.eq_ignore_ascii_case("stop") || trimmed.eq_ignore_ascii_case("exit") {
            break;
        }

        let result = match executor.execute(trimmed, None) {
            Ok(result) => result,
            Err(e) => {
                recorder.abort(handle);
                return Err(SessionError::Exec {
                    command: trimmed.to_string(),
                    source: e,
                });
            }
        };

        handle.append(trimmed, Some(result.stdout), result.exit_status)?;
        if let Some(step) = handle.steps.lock().last() {
            on_step(step);
        }
    }

    recorder.end(handle)
}

//! Command-sequence recording and replay
//!
//! A journey is a named, ordered recording of shell commands and their
//! captured results. The recorder accumulates steps strictly sequentially
//! until an explicit end-of-input signal; the player re-executes them in
//! stored order, reporting divergences without mutating the recording.

pub mod error;
pub mod export;
pub mod journey;
pub mod player;
pub mod recorder;
pub mod registry;

pub use error::{Result, SessionError};
pub use export::{export_journey, import_journey};
pub use journey::{Journey, JourneyStep};
pub use player::{
    CommandExecutor, Divergence, ExecutionResult, PlaybackMode, PlaybackOptions, PlaybackReport,
    SessionPlayer, ShellExecutor,
};
pub use recorder::{record_session, CommandSource, RecordingHandle, SessionRecorder, StdinSource};
pub use registry::JourneyRegistry;

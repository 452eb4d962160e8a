//! Journey replay against the live shell

use crate::error::{Result, SessionError};
use crate::journey::Journey;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Captured outcome of one command execution
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub stdout: String,
    pub exit_status: i32,
}

/// External command-execution collaborator
///
/// The player treats this as an opaque `execute(command) -> (output,
/// exit_status)` capability, so replay is testable without a shell.
pub trait CommandExecutor {
    fn execute(&self, command: &str, working_dir: Option<&Path>)
        -> std::io::Result<ExecutionResult>;
}

/// Runs commands through `sh -c`, capturing stdout
///
/// Stderr stays attached to the caller's terminal so interactive replay
/// looks like the original session.
pub struct ShellExecutor;

impl CommandExecutor for ShellExecutor {
    fn execute(
        &self,
        command: &str,
        working_dir: Option<&Path>,
    ) -> std::io::Result<ExecutionResult> {
        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(command)
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());
        if let Some(dir) = working_dir {
            if dir.is_dir() {
                cmd.current_dir(dir);
            }
        }

        let output = cmd.output()?;
        Ok(ExecutionResult {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            exit_status: output.status.code().unwrap_or(-1),
        })
    }
}

/// Replay failure policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackMode {
    /// Report divergences and continue; replay is workflow reproduction,
    /// not regression testing
    #[default]
    Lenient,
    /// Abort on the first divergence
    Strict,
}

/// Playback options
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaybackOptions {
    pub mode: PlaybackMode,
    /// Print steps without executing them
    pub dry_run: bool,
}

/// One step whose live exit status differed from the recording
#[derive(Debug, Clone)]
pub struct Divergence {
    pub step: usize,
    pub raw_command: String,
    pub recorded_exit: i32,
    pub live_exit: i32,
}

/// Outcome of a replay
///
/// The stored journey is never mutated: divergences are recorded here,
/// separately from the original recording.
#[derive(Debug, Default)]
pub struct PlaybackReport {
    /// Steps actually executed
    pub executed: usize,
    /// Steps skipped (dry run)
    pub skipped: usize,
    /// Steps whose live exit status differed from the recording
    pub divergences: Vec<Divergence>,
}

/// Replays journeys in stored order, one command at a time
pub struct SessionPlayer<E: CommandExecutor> {
    executor: E,
    options: PlaybackOptions,
}

impl SessionPlayer<ShellExecutor> {
    /// Player over the real shell
    pub fn new(options: PlaybackOptions) -> Self {
        Self::with_executor(ShellExecutor, options)
    }
}

impl<E: CommandExecutor> SessionPlayer<E> {
    /// Player over a custom execution collaborator
    pub fn with_executor(executor: E, options: PlaybackOptions) -> Self {
        Self { executor, options }
    }

    /// Execute the journey's steps in stored order
    ///
    /// Each step completes before the next begins. `cd` steps adjust the
    /// working directory for subsequent commands instead of spawning a
    /// shell. `on_step` is called before each step (for display).
    pub fn play<F>(&self, journey: &Journey, mut on_step: F) -> Result<PlaybackReport>
    where
        F: FnMut(usize, &str),
    {
        let mut report = PlaybackReport::default();
        let mut cwd_override: Option<PathBuf> = None;

        for (index, step) in journey.steps.iter().enumerate() {
            on_step(index, &step.raw_command);

            if self.options.dry_run {
                report.skipped += 1;
                continue;
            }

            // A recorded `cd` moves the replay cursor; the directory change
            // would be lost on a child shell.
            if let Some(target) = step.raw_command.trim().strip_prefix("cd ") {
                let base = cwd_override
                    .clone()
                    .or_else(|| step.working_dir.clone())
                    .unwrap_or_else(|| PathBuf::from("."));
                cwd_override = Some(base.join(target.trim()));
                report.executed += 1;
                continue;
            }

            let working_dir = cwd_override.as_deref().or(step.working_dir.as_deref());
            let result = self
                .executor
                .execute(&step.raw_command, working_dir)
                .map_err(|e| SessionError::Exec {
                    command: step.raw_command.clone(),
                    source: e,
                })?;
            report.executed += 1;

            if result.exit_status != step.exit_status {
                let divergence = Divergence {
                    step: index,
                    raw_command: step.raw_command.clone(),
                    recorded_exit: step.exit_status,
                    live_exit: result.exit_status,
                };
                tracing::warn!(
                    "step {index} '{}' diverged: recorded exit {}, live exit {}",
                    step.raw_command,
                    step.exit_status,
                    result.exit_status
                );

                if self.options.mode == PlaybackMode::Strict {
                    return Err(SessionError::Divergence {
                        step: index,
                        command: divergence.raw_command,
                        recorded: divergence.recorded_exit,
                        live: divergence.live_exit,
                    });
                }
                report.divergences.push(divergence);
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journey::JourneyStep;
    use chrono::Utc;
    use std::cell::RefCell;

    fn journey(steps: Vec<JourneyStep>) -> Journey {
        Journey {
            name: "test".to_string(),
            created_at: Utc::now(),
            steps,
        }
    }

    fn step(command: &str, exit_status: i32) -> JourneyStep {
        JourneyStep {
            raw_command: command.to_string(),
            captured_stdout: None,
            exit_status,
            timestamp: Utc::now(),
            working_dir: None,
        }
    }

    /// Executor that returns a fixed exit status per command and records
    /// the order it was invoked in
    struct ScriptedExecutor {
        exits: Vec<(&'static str, i32)>,
        calls: RefCell<Vec<String>>,
    }

    impl ScriptedExecutor {
        fn new(exits: Vec<(&'static str, i32)>) -> Self {
            Self {
                exits,
                calls: RefCell::new(Vec::new()),
            }
        }
    }

    impl CommandExecutor for ScriptedExecutor {
        fn execute(
            &self,
            command: &str,
            _working_dir: Option<&Path>,
        ) -> std::io::Result<ExecutionResult> {
            self.calls.borrow_mut().push(command.to_string());
            let exit_status = self
                .exits
                .iter()
                .find(|(c, _)| *c == command)
                .map(|(_, code)| *code)
                .unwrap_or(0);
            Ok(ExecutionResult {
                stdout: String::new(),
                exit_status,
            })
        }
    }

    #[test]
    fn test_play_preserves_order() {
        let executor = ScriptedExecutor::new(vec![]);
        let player = SessionPlayer::with_executor(executor, PlaybackOptions::default());

        let j = journey(vec![step("first", 0), step("second", 0), step("third", 0)]);
        let report = player.play(&j, |_, _| {}).unwrap();

        assert_eq!(report.executed, 3);
        assert_eq!(
            *player.executor.calls.borrow(),
            vec!["first", "second", "third"]
        );
    }

    #[test]
    fn test_lenient_mode_continues_past_divergence() {
        // "flaky" was recorded failing but now succeeds
        let executor = ScriptedExecutor::new(vec![("flaky", 0)]);
        let player = SessionPlayer::with_executor(executor, PlaybackOptions::default());

        let j = journey(vec![step("flaky", 1), step("after", 0)]);
        let report = player.play(&j, |_, _| {}).unwrap();

        assert_eq!(report.executed, 2, "replay continues after divergence");
        assert_eq!(report.divergences.len(), 1);
        assert_eq!(report.divergences[0].recorded_exit, 1);
        assert_eq!(report.divergences[0].live_exit, 0);
    }

    #[test]
    fn test_recorded_failure_reproduced_is_not_divergence() {
        let executor = ScriptedExecutor::new(vec![("false", 1)]);
        let player = SessionPlayer::with_executor(executor, PlaybackOptions::default());

        // Recorded with exit 1, replays with exit 1: faithful reproduction
        let j = journey(vec![step("echo hi", 0), step("false", 1)]);
        let report = player.play(&j, |_, _| {}).unwrap();

        assert_eq!(report.executed, 2);
        assert!(report.divergences.is_empty());
    }

    #[test]
    fn test_strict_mode_aborts_on_first_divergence() {
        let executor = ScriptedExecutor::new(vec![("flaky", 0)]);
        let player = SessionPlayer::with_executor(
            executor,
            PlaybackOptions {
                mode: PlaybackMode::Strict,
                dry_run: false,
            },
        );

        let j = journey(vec![step("flaky", 1), step("never", 0)]);
        let err = player.play(&j, |_, _| {}).unwrap_err();

        assert!(matches!(err, SessionError::Divergence { step: 0, .. }));
        assert_eq!(
            *player.executor.calls.borrow(),
            vec!["flaky"],
            "strict mode must not execute later steps"
        );
    }

    #[test]
    fn test_dry_run_executes_nothing() {
        let executor = ScriptedExecutor::new(vec![]);
        let player = SessionPlayer::with_executor(
            executor,
            PlaybackOptions {
                mode: PlaybackMode::Lenient,
                dry_run: true,
            },
        );

        let j = journey(vec![step("rm -rf /tmp/x", 0), step("make", 0)]);
        let mut shown = Vec::new();
        let report = player.play(&j, |_, cmd| shown.push(cmd.to_string())).unwrap();

        assert_eq!(report.skipped, 2);
        assert_eq!(report.executed, 0);
        assert!(player.executor.calls.borrow().is_empty());
        assert_eq!(shown, vec!["rm -rf /tmp/x", "make"]);
    }

    #[test]
    fn test_cd_adjusts_working_dir_for_next_step() {
        struct CwdCapture {
            seen: RefCell<Vec<Option<PathBuf>>>,
        }
        impl CommandExecutor for CwdCapture {
            fn execute(
                &self,
                _command: &str,
                working_dir: Option<&Path>,
            ) -> std::io::Result<ExecutionResult> {
                self.seen
                    .borrow_mut()
                    .push(working_dir.map(|p| p.to_path_buf()));
                Ok(ExecutionResult {
                    stdout: String::new(),
                    exit_status: 0,
                })
            }
        }

        let executor = CwdCapture {
            seen: RefCell::new(Vec::new()),
        };
        let player = SessionPlayer::with_executor(executor, PlaybackOptions::default());

        let mut cd = step("cd sub/dir", 0);
        cd.working_dir = Some(PathBuf::from("/project"));
        let j = journey(vec![cd, step("ls", 0)]);

        let report = player.play(&j, |_, _| {}).unwrap();
        assert_eq!(report.executed, 2);
        assert_eq!(
            player.executor.seen.borrow()[0],
            Some(PathBuf::from("/project/sub/dir"))
        );
    }

    #[test]
    fn test_shell_executor_captures_stdout_and_status() {
        let executor = ShellExecutor;

        let ok = executor.execute("echo hi", None).unwrap();
        assert_eq!(ok.stdout, "hi\n");
        assert_eq!(ok.exit_status, 0);

        let fail = executor.execute("exit 3", None).unwrap();
        assert_eq!(fail.exit_status, 3);
    }

    #[test]
    fn test_shell_executor_working_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("marker.txt"), "m").unwrap();

        let executor = ShellExecutor;
        let result = executor.execute("ls", Some(dir.path())).unwrap();
        assert!(result.stdout.contains("marker.txt"));
    }
}

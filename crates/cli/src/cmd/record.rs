//! Record a command journey interactively

use crate::util;
use anyhow::Result;
use moor_session::{record_session, CommandSource, SessionRecorder, ShellExecutor, StdinSource};
use owo_colors::OwoColorize;
use std::io::Write;

/// Stdin source that prints a prompt before each read
struct PromptingSource {
    inner: StdinSource,
}

impl CommandSource for PromptingSource {
    fn next_command(&mut self) -> std::io::Result<Option<String>> {
        print!("{} ", "$".green().bold());
        std::io::stdout().flush()?;
        self.inner.next_command()
    }
}

pub fn run(name: &str) -> Result<()> {
    let registry = util::open_journeys()?;
    let recorder = SessionRecorder::new(registry);

    println!("Recording journey {}", name.cyan().bold());
    println!(
        "{}",
        "Type commands to record them; Ctrl+D or 'stop' ends the recording".dimmed()
    );
    println!();

    let mut source = PromptingSource {
        inner: StdinSource::new(),
    };

    let journey = record_session(&recorder, name, &mut source, &ShellExecutor, |step| {
        if let Some(stdout) = &step.captured_stdout {
            print!("{stdout}");
        }
        let status = if step.exit_status == 0 {
            format!("exit {}", step.exit_status).dimmed().to_string()
        } else {
            format!("exit {}", step.exit_status).red().to_string()
        };
        println!("{} recorded ({status})", "•".dimmed());
    })?;

    println!();
    println!(
        "{} Journey {} recorded with {} step(s)",
        "✓".green(),
        journey.name.cyan().bold(),
        journey.steps.len()
    );
    println!("{}", format!("Replay with 'moor play {name}'").dimmed());

    Ok(())
}

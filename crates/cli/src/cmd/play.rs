//! Replay a recorded journey

use crate::util;
use anyhow::Result;
use moor_session::{PlaybackMode, PlaybackOptions, SessionError, SessionPlayer};
use owo_colors::OwoColorize;

pub fn run(name: &str, strict: bool, dry_run: bool) -> Result<()> {
    let registry = util::open_journeys()?;

    let journey = registry
        .get(name)?
        .ok_or_else(|| SessionError::NotFound(name.to_string()))?;

    println!(
        "Playing journey {} ({} step(s){})",
        name.cyan().bold(),
        journey.steps.len(),
        if dry_run { ", dry run" } else { "" }
    );
    println!();

    let options = PlaybackOptions {
        mode: if strict {
            PlaybackMode::Strict
        } else {
            PlaybackMode::Lenient
        },
        dry_run,
    };

    let player = SessionPlayer::new(options);
    let report = player.play(&journey, |index, command| {
        println!(
            "{} {}",
            format!("[{}/{}]", index + 1, journey.steps.len()).dimmed(),
            command.green()
        );
    })?;

    println!();
    if report.divergences.is_empty() {
        if dry_run {
            println!("{} {} step(s) shown, none executed", "✓".green(), report.skipped);
        } else {
            println!(
                "{} Journey completed, {} step(s) executed",
                "✓".green(),
                report.executed
            );
        }
    } else {
        println!(
            "{} Journey completed with {} divergence(s):",
            "⚠".yellow(),
            report.divergences.len()
        );
        for divergence in &report.divergences {
            println!(
                "  step {} '{}': recorded exit {}, live exit {}",
                divergence.step + 1,
                divergence.raw_command.yellow(),
                divergence.recorded_exit,
                divergence.live_exit
            );
        }
    }

    Ok(())
}

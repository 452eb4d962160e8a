//! Restore the project tree to an anchor's state

use crate::util;
use anyhow::Result;
use moor_anchor::AnchorError;
use owo_colors::OwoColorize;
use std::io::Write;

pub async fn run(name: &str, no_wait: bool, yes: bool) -> Result<()> {
    let (_store, manager) = util::open_manager()?;

    let anchor = manager.get(name)?;

    if !yes {
        println!("{}", "Restore Anchor".bold());
        println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        println!();
        println!(
            "Anchor: {} {}",
            name.yellow(),
            util::format_relative_time(anchor.created_at).dimmed()
        );
        println!("Files:  {}", anchor.file_tree.len());
        println!();
        println!(
            "{}",
            "⚠  This overwrites the working directory and deletes files the anchor does not contain."
                .red()
                .bold()
        );
        print!("Continue? [y/N] ");
        std::io::stdout().flush()?;

        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;
        if !input.trim().eq_ignore_ascii_case("y") {
            println!("{}", "Restore cancelled".yellow());
            return Ok(());
        }
        println!();
    }

    match manager.restore(name, !no_wait).await {
        Ok(report) => {
            println!(
                "{} Restored {} ({} written, {} deleted, {} unchanged)",
                "✓".green(),
                name.cyan().bold(),
                report.restored,
                report.deleted,
                report.unchanged
            );
            Ok(())
        }
        Err(AnchorError::RestoreFailed { name, report }) => {
            println!(
                "{} Restored {} with {} failure(s) ({} written, {} deleted)",
                "⚠".yellow(),
                name.cyan(),
                report.failures.len(),
                report.restored,
                report.deleted
            );
            println!();
            println!("{}", "Failed paths:".red().bold());
            for failure in &report.failures {
                println!(
                    "  {}: {}",
                    failure.path.display().to_string().red(),
                    failure.cause
                );
            }
            anyhow::bail!("restore of '{name}' was incomplete");
        }
        Err(e) => Err(e.into()),
    }
}

//! Diff an anchor against the current live tree

use crate::util;
use anyhow::Result;
use owo_colors::OwoColorize;

pub async fn run(name: &str) -> Result<()> {
    let (_store, manager) = util::open_manager()?;

    let diff = manager.diff(name).await?;

    println!("{}", format!("=== Diff from anchor '{name}' ===").blue().bold());

    if !diff.added.is_empty() {
        println!();
        println!("Added files:");
        for path in &diff.added {
            println!("  {} {}", "+".green(), path.display().to_string().green());
        }
    }

    if !diff.modified.is_empty() {
        println!();
        println!("Modified files:");
        for modified in &diff.modified {
            println!(
                "  {} {}",
                "~".yellow(),
                modified.path.display().to_string().yellow()
            );
        }
    }

    if !diff.removed.is_empty() {
        println!();
        println!("Deleted files:");
        for path in &diff.removed {
            println!("  {} {}", "-".red(), path.display().to_string().red());
        }
    }

    if !diff.unreadable.is_empty() {
        println!();
        println!("Unreadable paths:");
        for unreadable in &diff.unreadable {
            println!(
                "  {} {} ({})",
                "?".dimmed(),
                unreadable.path.display(),
                unreadable.cause.dimmed()
            );
        }
    }

    if diff.is_empty() && diff.unreadable.is_empty() {
        println!("{}", format!("No changes since anchor '{name}'").green());
    }

    Ok(())
}

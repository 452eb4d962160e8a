//! Snapshot the project tree as a named anchor

use crate::util;
use anyhow::Result;
use owo_colors::OwoColorize;

pub async fn run(name: &str) -> Result<()> {
    let (_store, manager) = util::open_manager()?;

    let outcome = manager.save(name).await?;
    let anchor = &outcome.anchor;

    println!(
        "{} Saved anchor {} ({} files, {})",
        "✓".green(),
        name.cyan().bold(),
        anchor.file_tree.len(),
        util::human_size(anchor.approx_size())
    );

    if !outcome.unreadable.is_empty() {
        println!();
        println!(
            "{} {} path(s) could not be read:",
            "⚠".yellow(),
            outcome.unreadable.len()
        );
        for skipped in outcome.unreadable.iter().take(10) {
            println!("  {}: {}", skipped.path.display(), skipped.cause.dimmed());
        }
        if outcome.unreadable.len() > 10 {
            println!("  ... and {} more", outcome.unreadable.len() - 10);
        }
    }

    Ok(())
}

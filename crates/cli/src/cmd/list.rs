//! List all anchors

use crate::util;
use anyhow::Result;
use owo_colors::OwoColorize;

pub fn run() -> Result<()> {
    let (_store, manager) = util::open_manager()?;

    let anchors = manager.list()?;
    if anchors.is_empty() {
        println!("{}", "No anchors yet".dimmed());
        println!("{}", "Tip: 'moor save <name>' snapshots the project".dimmed());
        return Ok(());
    }

    for summary in anchors {
        let tracked = if summary.tracked {
            " [tracking]".green().to_string()
        } else {
            String::new()
        };
        println!(
            "{} - {} ({} files, {}){}",
            summary.name.cyan().bold(),
            util::format_relative_time(summary.created_at).dimmed(),
            summary.file_count,
            util::human_size(summary.approx_size),
            tracked
        );
    }

    Ok(())
}

//! Show one anchor's details

use crate::util;
use anyhow::Result;
use owo_colors::OwoColorize;

pub fn run(name: &str) -> Result<()> {
    let (_store, manager) = util::open_manager()?;
    let anchor = manager.get(name)?;

    println!("{}", format!("=== Anchor: {} ===", anchor.name).blue().bold());
    println!(
        "Created:  {} ({})",
        anchor.created_at.format("%Y-%m-%d %H:%M:%S UTC"),
        util::format_relative_time(anchor.created_at).dimmed()
    );
    println!(
        "Tracked:  {}",
        if anchor.tracked {
            "yes".green().to_string()
        } else {
            "no".to_string()
        }
    );
    if let Some(session) = anchor.tracking_session {
        println!("Session:  {}", session.to_string().dimmed());
    }
    println!("Size:     {}", util::human_size(anchor.approx_size()));
    println!();

    println!("Files ({}):", anchor.file_tree.len());
    for (path, entry) in anchor.file_tree.iter().take(10) {
        println!(
            "  {} {}",
            path.display(),
            util::human_size(entry.size).dimmed()
        );
    }
    if anchor.file_tree.len() > 10 {
        println!("  ... and {} more files", anchor.file_tree.len() - 10);
    }

    Ok(())
}

//! Show store and tracking status

use crate::locks;
use crate::util;
use anyhow::Result;
use owo_colors::OwoColorize;

pub fn run() -> Result<()> {
    let root = util::find_repo_root()?;
    let moor_dir = root.join(".moor");

    println!("{}", "moor Status".bold());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!();
    println!("Project:  {}", root.display().to_string().cyan());
    println!();

    // Active tracking processes, from their lock files
    let mut active = Vec::new();
    if let Ok(entries) = std::fs::read_dir(moor_dir.join("locks")) {
        for entry in entries.flatten() {
            let Some(content) = locks::read_lock(&entry.path()) else {
                continue;
            };
            if locks::is_process_alive(content.pid) {
                active.push(content);
            }
        }
    }

    if active.is_empty() {
        println!("Tracking: {}", "none".dimmed());
    } else {
        println!("Tracking:");
        for lock in &active {
            println!(
                "  {} {}",
                lock.anchor.cyan().bold(),
                format!("(pid {})", lock.pid).dimmed()
            );
        }
    }
    println!();

    // Registry contents; unavailable while a tracking process holds the db
    match util::open_manager() {
        Ok((_store, manager)) => {
            let anchors = manager.list()?;
            println!("Anchors:  {}", anchors.len());
            for summary in anchors.iter().take(5) {
                let tracked = if summary.tracked { " [tracking]" } else { "" };
                println!(
                    "  {} - {}{}",
                    summary.name.cyan(),
                    util::format_relative_time(summary.created_at).dimmed(),
                    tracked.green()
                );
            }
            if anchors.len() > 5 {
                println!("  ... and {} more", anchors.len() - 5);
            }
        }
        Err(e) => {
            println!("Anchors:  {}", format!("unavailable ({e})").dimmed());
        }
    }

    match util::open_journeys() {
        Ok(registry) => {
            println!("Journeys: {}", registry.list()?.len());
        }
        Err(e) => {
            println!("Journeys: {}", format!("unavailable ({e})").dimmed());
        }
    }

    Ok(())
}

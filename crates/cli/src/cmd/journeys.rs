//! List and delete journeys

use crate::util;
use anyhow::Result;
use moor_session::SessionError;
use owo_colors::OwoColorize;

pub fn run() -> Result<()> {
    let registry = util::open_journeys()?;

    let journeys = registry.list()?;
    if journeys.is_empty() {
        println!("{}", "No journeys yet".dimmed());
        println!(
            "{}",
            "Tip: 'moor record <name>' records a command journey".dimmed()
        );
        return Ok(());
    }

    for journey in journeys {
        println!(
            "{} - {} ({} step(s))",
            journey.name.cyan().bold(),
            util::format_relative_time(journey.created_at).dimmed(),
            journey.steps.len()
        );
    }

    Ok(())
}

pub fn remove(name: &str) -> Result<()> {
    let registry = util::open_journeys()?;

    if !registry.remove(name)? {
        return Err(SessionError::NotFound(name.to_string()).into());
    }
    println!("{} Removed journey {}", "✓".green(), name.cyan());

    Ok(())
}

//! Delete an anchor

use crate::util;
use anyhow::Result;
use owo_colors::OwoColorize;

pub async fn run(name: &str) -> Result<()> {
    let (_store, manager) = util::open_manager()?;

    manager.remove(name).await?;
    println!("{} Removed anchor {}", "✓".green(), name.cyan());

    Ok(())
}

//! Initialize moor in the current directory

use anyhow::{Context, Result};
use moor_core::Store;
use owo_colors::OwoColorize;

pub fn run() -> Result<()> {
    let cwd = std::env::current_dir().context("Failed to get current directory")?;

    let store = Store::init(&cwd)?;

    println!(
        "{} Initialized moor store in {}",
        "✓".green(),
        store.moor_dir().display().to_string().cyan()
    );
    println!();
    println!("{}", "Next steps:".bold());
    println!("  moor save <name>     snapshot the project tree");
    println!("  moor auto <name>     keep an anchor current in the background");
    println!("  moor record <name>   record a command journey");

    Ok(())
}

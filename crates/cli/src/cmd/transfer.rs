//! Export and import of anchors and journeys

use crate::util;
use anyhow::Result;
use owo_colors::OwoColorize;
use std::path::Path;

pub fn export_anchor(name: &str, output: &Path) -> Result<()> {
    let (_store, manager) = util::open_manager()?;

    moor_anchor::export_anchor(manager.registry(), name, output)?;
    println!(
        "{} Exported anchor {} to {}",
        "✓".green(),
        name.cyan(),
        output.display()
    );
    Ok(())
}

pub fn import_anchor(file: &Path) -> Result<()> {
    let (_store, manager) = util::open_manager()?;

    let anchor = moor_anchor::import_anchor(manager.registry(), file)?;
    println!(
        "{} Imported anchor {} ({} files)",
        "✓".green(),
        anchor.name.cyan(),
        anchor.file_tree.len()
    );
    Ok(())
}

pub fn export_journey(name: &str, output: &Path) -> Result<()> {
    let registry = util::open_journeys()?;

    moor_session::export_journey(&registry, name, output)?;
    println!(
        "{} Exported journey {} to {}",
        "✓".green(),
        name.cyan(),
        output.display()
    );
    Ok(())
}

pub fn import_journey(file: &Path) -> Result<()> {
    let registry = util::open_journeys()?;

    let journey = moor_session::import_journey(&registry, file)?;
    println!(
        "{} Imported journey {} ({} step(s))",
        "✓".green(),
        journey.name.cyan(),
        journey.steps.len()
    );
    Ok(())
}

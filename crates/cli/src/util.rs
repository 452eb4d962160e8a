//! Shared utilities for CLI commands

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use moor_anchor::AnchorManager;
use moor_core::Store;
use moor_session::JourneyRegistry;
use std::path::PathBuf;
use std::sync::Arc;

/// Find the project root by walking up from cwd to find `.moor/`
pub fn find_repo_root() -> Result<PathBuf> {
    let mut current = std::env::current_dir().context("Failed to get current directory")?;

    loop {
        if current.join(".moor").is_dir() {
            return Ok(current);
        }

        match current.parent() {
            Some(parent) => current = parent.to_path_buf(),
            None => anyhow::bail!("Not a moor project (no .moor directory found); run 'moor init'"),
        }
    }
}

/// Open the store at the enclosing project root
pub fn open_store() -> Result<Arc<Store>> {
    let root = find_repo_root()?;
    Ok(Arc::new(Store::open(&root)?))
}

/// Open the store and construct an anchor manager over it
pub fn open_manager() -> Result<(Arc<Store>, AnchorManager)> {
    let store = open_store()?;
    let manager = AnchorManager::new(Arc::clone(&store))
        .context("Failed to open anchor registry (is another moor process tracking?)")?;
    Ok((store, manager))
}

/// Open the journey registry
pub fn open_journeys() -> Result<Arc<JourneyRegistry>> {
    let store = open_store()?;
    let registry = JourneyRegistry::open(&store.journeys_db())
        .context("Failed to open journey registry")?;
    Ok(Arc::new(registry))
}

/// Format a timestamp as relative time ("2 hours ago")
pub fn format_relative_time(time: DateTime<Utc>) -> String {
    let seconds = (Utc::now() - time).num_seconds();
    if seconds < 0 {
        return "in the future".to_string();
    }
    let seconds = seconds as u64;

    if seconds < 60 {
        format!("{} seconds ago", seconds)
    } else if seconds < 3600 {
        format!("{} minutes ago", seconds / 60)
    } else if seconds < 86400 {
        format!("{} hours ago", seconds / 3600)
    } else if seconds < 604800 {
        format!("{} days ago", seconds / 86400)
    } else {
        format!("{} weeks ago", seconds / 604800)
    }
}

/// Format a byte count for humans
pub fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

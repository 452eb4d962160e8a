//! Stop a tracking process

use crate::ipc::{self, IpcClient};
use crate::locks;
use crate::util;
use anyhow::Result;
use owo_colors::OwoColorize;
use std::time::{Duration, Instant};

pub async fn run(name: &str) -> Result<()> {
    let root = util::find_repo_root()?;
    let moor_dir = root.join(".moor");

    let socket = ipc::socket_path(&moor_dir, name);
    if !socket.exists() {
        println!("Anchor '{name}' is not being tracked");
        return Ok(());
    }

    let mut client = match IpcClient::connect(&socket).await {
        Ok(client) => client,
        Err(_) => {
            // Dead socket left behind by a crashed process
            let _ = std::fs::remove_file(&socket);
            println!("Anchor '{name}' is not being tracked (cleaned up stale socket)");
            return Ok(());
        }
    };

    client.stop().await?;

    // Wait for the tracking process to release its lock; stop is only done
    // once the final batch has been applied and the process exited.
    let lock_path = locks::lock_path(&moor_dir, name);
    let timeout = Duration::from_secs(10);
    let start = Instant::now();
    while lock_path.exists() && start.elapsed() < timeout {
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    if lock_path.exists() {
        anyhow::bail!("tracking process for '{name}' did not exit in time");
    }

    println!("{} Stopped tracking {}", "✓".green(), name.cyan());
    Ok(())
}

//! Lock files for tracking-process exclusivity
//!
//! One lock per anchor name prevents two processes from double-applying
//! watcher events to the same anchor. Stale locks left by crashed processes
//! are detected by PID and cleared.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Held for the lifetime of a tracking process
pub struct TrackLock {
    path: PathBuf,
    #[allow(dead_code)]
    file: File,
}

/// Lock file content
#[derive(Debug, Serialize, Deserialize)]
pub struct LockContent {
    pub pid: u32,
    pub anchor: String,
    pub started_at_ms: u64,
}

/// Lock file path for one anchor
pub fn lock_path(moor_dir: &Path, anchor: &str) -> PathBuf {
    moor_dir.join("locks").join(format!("track-{anchor}.lock"))
}

impl TrackLock {
    /// Acquire the exclusive tracking lock for an anchor
    pub fn acquire(moor_dir: &Path, anchor: &str) -> Result<Self> {
        let path = lock_path(moor_dir, anchor);

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create locks directory")?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .context("Failed to open lock file")?;

        if !try_flock_exclusive(&file)? {
            if Self::is_stale(&mut file)? {
                tracing::warn!("removing stale tracking lock for '{anchor}'");
                drop(file);
                std::fs::remove_file(&path)?;
                return Self::acquire(moor_dir, anchor);
            }
            anyhow::bail!("anchor '{anchor}' is already tracked by another process");
        }

        let content = LockContent {
            pid: std::process::id(),
            anchor: anchor.to_string(),
            started_at_ms: now_ms(),
        };
        let serialized = serde_json::to_string(&content)?;
        file.set_len(0)?;
        file.seek(SeekFrom::Start(0))?;
        file.write_all(serialized.as_bytes())?;
        file.sync_all()?;

        Ok(Self { path, file })
    }

    fn is_stale(file: &mut File) -> Result<bool> {
        match read_lock_content(file) {
            Ok(content) => Ok(!is_process_alive(content.pid)),
            // Unreadable content means a half-written lock; treat as stale
            Err(_) => Ok(true),
        }
    }
}

impl Drop for TrackLock {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

/// Read the content of a lock file at rest (for status display)
pub fn read_lock(path: &Path) -> Option<LockContent> {
    let mut file = File::open(path).ok()?;
    read_lock_content(&mut file).ok()
}

fn read_lock_content(file: &mut File) -> Result<LockContent> {
    file.seek(SeekFrom::Start(0))?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;
    Ok(serde_json::from_str(&contents)?)
}

/// Try to acquire an exclusive file lock (non-blocking)
#[cfg(unix)]
fn try_flock_exclusive(file: &File) -> Result<bool> {
    use std::os::unix::io::AsRawFd;

    let rc = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
    if rc == 0 {
        return Ok(true);
    }
    let err = std::io::Error::last_os_error();
    if err.raw_os_error() == Some(libc::EWOULDBLOCK) {
        Ok(false)
    } else {
        Err(err).context("flock failed")
    }
}

#[cfg(not(unix))]
fn try_flock_exclusive(_file: &File) -> Result<bool> {
    // No advisory locks; fall back to PID-based staleness only
    Ok(true)
}

/// Check if a process is alive
#[cfg(target_os = "linux")]
pub fn is_process_alive(pid: u32) -> bool {
    Path::new(&format!("/proc/{pid}")).exists()
}

#[cfg(all(unix, not(target_os = "linux")))]
pub fn is_process_alive(pid: u32) -> bool {
    // Signal 0 checks existence without delivering anything
    unsafe { libc::kill(pid as i32, 0) == 0 }
}

#[cfg(not(unix))]
pub fn is_process_alive(_pid: u32) -> bool {
    true
}

fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("system time before Unix epoch")
        .as_millis() as u64
}

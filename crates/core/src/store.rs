//! On-disk store layout and management

use crate::blob::BlobStore;
use crate::config::StoreConfig;
use crate::error::{CoreError, Result};
use std::path::{Path, PathBuf};

/// Name of the store directory at the project root
pub const STORE_DIR: &str = ".moor";

/// Main store for moor data
///
/// Manages the `.moor/` directory structure:
/// ```text
/// .moor/
///   config.toml
///   objects/
///     blobs/
///   anchors.db
///   journeys.db
///   locks/
///   state/
///   tmp/
///     ingest/
/// ```
pub struct Store {
    /// Project root
    root: PathBuf,
    /// Path to the .moor directory
    moor_dir: PathBuf,
    /// Blob storage
    blobs: BlobStore,
    /// Parsed configuration
    config: StoreConfig,
}

impl Store {
    /// Initialize a new store at the given project root
    pub fn init(root: &Path) -> Result<Self> {
        let moor_dir = root.join(STORE_DIR);

        if moor_dir.exists() {
            return Err(CoreError::AlreadyInitialized(root.to_path_buf()));
        }

        let mkdir = |p: PathBuf| -> Result<()> {
            std::fs::create_dir_all(&p).map_err(|e| CoreError::io(&p, e))
        };
        mkdir(moor_dir.clone())?;
        mkdir(moor_dir.join("objects/blobs"))?;
        mkdir(moor_dir.join("locks"))?;
        mkdir(moor_dir.join("state"))?;
        mkdir(moor_dir.join("tmp/ingest"))?;

        let config = StoreConfig::default();
        let config_path = moor_dir.join("config.toml");
        std::fs::write(&config_path, config.to_toml()?)
            .map_err(|e| CoreError::io(&config_path, e))?;

        let blobs = BlobStore::new(moor_dir.clone(), config.store.compression_threshold);

        tracing::debug!("initialized store at {}", moor_dir.display());
        Ok(Self {
            root: root.to_path_buf(),
            moor_dir,
            blobs,
            config,
        })
    }

    /// Open an existing store
    pub fn open(root: &Path) -> Result<Self> {
        let moor_dir = root.join(STORE_DIR);

        if !moor_dir.is_dir() {
            return Err(CoreError::NotInitialized(root.to_path_buf()));
        }

        for dir in ["objects/blobs", "locks", "state", "tmp/ingest"] {
            let path = moor_dir.join(dir);
            if !path.exists() {
                return Err(CoreError::Corrupt(format!(
                    "missing required directory: {dir}"
                )));
            }
        }

        let config_path = moor_dir.join("config.toml");
        if !config_path.exists() {
            return Err(CoreError::Corrupt("missing config.toml".to_string()));
        }
        let config = StoreConfig::load(&config_path)?;

        let blobs = BlobStore::new(moor_dir.clone(), config.store.compression_threshold);

        Ok(Self {
            root: root.to_path_buf(),
            moor_dir,
            blobs,
            config,
        })
    }

    /// Get the blob store
    pub fn blobs(&self) -> &BlobStore {
        &self.blobs
    }

    /// Get the parsed configuration
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Get the .moor directory path
    pub fn moor_dir(&self) -> &Path {
        &self.moor_dir
    }

    /// Get the project root path
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the anchor registry database
    pub fn anchors_db(&self) -> PathBuf {
        self.moor_dir.join("anchors.db")
    }

    /// Path of the journey registry database
    pub fn journeys_db(&self) -> PathBuf {
        self.moor_dir.join("journeys.db")
    }
}

/// Atomic write helper
///
/// Writes data to a temporary file, fsyncs it, then renames it to the target
/// path. Rename is atomic on POSIX, so readers never see partial content.
pub fn atomic_write(tmp_dir: &Path, target: &Path, data: &[u8]) -> Result<()> {
    use std::io::Write;

    std::fs::create_dir_all(tmp_dir).map_err(|e| CoreError::io(tmp_dir, e))?;

    let temp_path = tmp_dir.join(uuid::Uuid::new_v4().to_string());

    let mut temp_file =
        std::fs::File::create(&temp_path).map_err(|e| CoreError::io(&temp_path, e))?;
    temp_file
        .write_all(data)
        .map_err(|e| CoreError::io(&temp_path, e))?;
    temp_file
        .sync_all()
        .map_err(|e| CoreError::io(&temp_path, e))?;
    drop(temp_file);

    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent).map_err(|e| CoreError::io(parent, e))?;
    }

    std::fs::rename(&temp_path, target).map_err(|e| CoreError::io(target, e))?;

    // Fsync parent directory for durability; best effort
    if let Some(parent) = target.parent() {
        if let Ok(dir) = std::fs::File::open(parent) {
            let _ = dir.sync_all();
        }
    }

    Ok(())
}

/// Normalize a path for storage
///
/// - Rejects absolute paths and `..` traversal
/// - Removes a leading `./`
/// - Converts backslashes to forward slashes
pub fn normalize_path(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Err(CoreError::InvalidPath(format!(
            "absolute paths not allowed: {}",
            path.display()
        )));
    }

    for component in path.components() {
        match component {
            std::path::Component::ParentDir => {
                return Err(CoreError::InvalidPath(format!(
                    "path traversal not allowed: {}",
                    path.display()
                )));
            }
            std::path::Component::RootDir => {
                return Err(CoreError::InvalidPath(format!(
                    "absolute paths not allowed: {}",
                    path.display()
                )));
            }
            _ => {}
        }
    }

    let path_str = path.to_string_lossy();
    let normalized = path_str.strip_prefix("./").unwrap_or(&path_str);
    let normalized = normalized.replace('\\', "/");

    Ok(PathBuf::from(normalized))
}

/// Check if a relative path belongs to the store or VCS metadata
pub fn should_ignore(path: &Path) -> bool {
    path.starts_with(STORE_DIR) || path.starts_with(".git")
}

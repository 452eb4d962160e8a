//! Content-addressed snapshot storage for moor
//!
//! This crate provides:
//! - BLAKE3 content hashing (chunked for large files)
//! - Content-addressed blob storage with compression
//! - Ordered file trees and deterministic tree diffing
//! - Project tree enumeration with unreadable-path reporting
//! - The `.moor/` store layout and configuration

pub mod blob;
pub mod config;
pub mod diff;
pub mod error;
pub mod hash;
pub mod scan;
pub mod store;
pub mod tree;

// Re-exports
pub use blob::BlobStore;
pub use config::{StoreConfig, StoreSection, WatcherSection};
pub use diff::{DiffResult, Modified, Unreadable};
pub use error::{CoreError, Result};
pub use hash::{hash_bytes, hash_path, ContentHash};
pub use scan::{enumerate, ScanEntry, ScanOutcome};
pub use store::{atomic_write, normalize_path, should_ignore, Store};
pub use tree::{FileEntry, FileTree};

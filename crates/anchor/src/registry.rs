//! Sled-backed registry of anchors by name

use crate::anchor::{Anchor, AnchorSummary};
use crate::error::Result;
use std::path::Path;

/// Durable name -> anchor store
///
/// An explicit registry object rather than process-wide state, so multiple
/// instances can be constructed and tested in isolation.
pub struct AnchorRegistry {
    db: sled::Db,
}

impl AnchorRegistry {
    /// Open or create a registry at the given database path
    pub fn open(path: &Path) -> Result<Self> {
        let db = sled::open(path)?;
        Ok(Self { db })
    }

    /// Insert or replace an anchor record
    pub fn put(&self, anchor: &Anchor) -> Result<()> {
        self.db
            .insert(anchor.name.as_bytes(), anchor.to_bytes()?)?;
        self.db.flush()?;
        Ok(())
    }

    /// Get an anchor by name
    pub fn get(&self, name: &str) -> Result<Option<Anchor>> {
        match self.db.get(name.as_bytes())? {
            Some(bytes) => Ok(Some(Anchor::from_bytes(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Delete an anchor; returns whether it existed
    pub fn remove(&self, name: &str) -> Result<bool> {
        let existed = self.db.remove(name.as_bytes())?.is_some();
        self.db.flush()?;
        Ok(existed)
    }

    /// Check whether an anchor exists
    pub fn contains(&self, name: &str) -> Result<bool> {
        Ok(self.db.contains_key(name.as_bytes())?)
    }

    /// All anchor summaries, newest first
    pub fn list(&self) -> Result<Vec<AnchorSummary>> {
        let mut summaries = Vec::new();
        for item in self.db.iter() {
            let (_, bytes) = item?;
            summaries.push(Anchor::from_bytes(&bytes)?.summary());
        }
        summaries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(summaries)
    }
}

//! Sled-backed registry of journeys by name

use crate::error::Result;
use crate::journey::Journey;
use std::path::Path;

/// Durable name -> journey store
///
/// Like the anchor registry, this is an explicit object handed to the
/// recorder at construction, never process-wide state.
pub struct JourneyRegistry {
    db: sled::Db,
}

impl JourneyRegistry {
    /// Open or create a registry at the given database path
    pub fn open(path: &Path) -> Result<Self> {
        let db = sled::open(path)?;
        Ok(Self { db })
    }

    /// Insert or replace a journey record
    pub fn put(&self, journey: &Journey) -> Result<()> {
        self.db
            .insert(journey.name.as_bytes(), journey.to_bytes()?)?;
        self.db.flush()?;
        Ok(())
    }

    /// Get a journey by name
    pub fn get(&self, name: &str) -> Result<Option<Journey>> {
        match self.db.get(name.as_bytes())? {
            Some(bytes) => Ok(Some(Journey::from_bytes(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Delete a journey; returns whether it existed
    pub fn remove(&self, name: &str) -> Result<bool> {
        let existed = self.db.remove(name.as_bytes())?.is_some();
        self.db.flush()?;
        Ok(existed)
    }

    /// All journeys, newest first
    pub fn list(&self) -> Result<Vec<Journey>> {
        let mut journeys = Vec::new();
        for item in self.db.iter() {
            let (_, bytes) = item?;
            journeys.push(Journey::from_bytes(&bytes)?);
        }
        journeys.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(journeys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journey::JourneyStep;
    use chrono::Utc;

    fn journey(name: &str) -> Journey {
        Journey {
            name: name.to_string(),
            created_at: Utc::now(),
            steps: vec![JourneyStep::capture("echo hi", Some("hi\n".into()), 0)],
        }
    }

    #[test]
    fn test_put_get_remove() {
        let dir = tempfile::tempdir().unwrap();
        let registry = JourneyRegistry::open(&dir.path().join("journeys.db")).unwrap();

        registry.put(&journey("j")).unwrap();
        assert!(registry.get("j").unwrap().is_some());
        assert!(registry.get("other").unwrap().is_none());

        assert!(registry.remove("j").unwrap());
        assert!(!registry.remove("j").unwrap());
        assert!(registry.get("j").unwrap().is_none());
    }

    #[test]
    fn test_list_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let registry = JourneyRegistry::open(&dir.path().join("journeys.db")).unwrap();

        registry.put(&journey("old")).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(2));
        registry.put(&journey("new")).unwrap();

        let list = registry.list().unwrap();
        assert_eq!(list[0].name, "new");
        assert_eq!(list[1].name, "old");
    }

    #[test]
    fn test_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("journeys.db");

        {
            let registry = JourneyRegistry::open(&path).unwrap();
            registry.put(&journey("durable")).unwrap();
        }

        let registry = JourneyRegistry::open(&path).unwrap();
        let loaded = registry.get("durable").unwrap().unwrap();
        assert_eq!(loaded.steps.len(), 1);
    }
}

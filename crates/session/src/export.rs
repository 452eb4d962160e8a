//! Self-describing export/import of journey records

use crate::error::{Result, SessionError};
use crate::journey::Journey;
use crate::registry::JourneyRegistry;
use serde::{Deserialize, Serialize};
use std::path::Path;

const FORMAT: &str = "moor-journey";
const VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct JourneyEnvelope {
    format: String,
    version: u32,
    journey: Journey,
}

/// Export a journey to a self-describing JSON file
pub fn export_journey(registry: &JourneyRegistry, name: &str, output: &Path) -> Result<()> {
    let journey = registry
        .get(name)?
        .ok_or_else(|| SessionError::NotFound(name.to_string()))?;

    let envelope = JourneyEnvelope {
        format: FORMAT.to_string(),
        version: VERSION,
        journey,
    };

    let json = serde_json::to_string_pretty(&envelope)
        .map_err(|e| SessionError::InvalidExport(e.to_string()))?;
    std::fs::write(output, json).map_err(|e| SessionError::io(output, e))?;

    Ok(())
}

/// Import a journey from an export file, registering it under its own name
pub fn import_journey(registry: &JourneyRegistry, file: &Path) -> Result<Journey> {
    let content = std::fs::read_to_string(file).map_err(|e| SessionError::io(file, e))?;

    let envelope: JourneyEnvelope = serde_json::from_str(&content)
        .map_err(|e| SessionError::InvalidExport(e.to_string()))?;

    if envelope.format != FORMAT {
        return Err(SessionError::InvalidExport(format!(
            "unexpected format '{}'",
            envelope.format
        )));
    }
    if envelope.version != VERSION {
        return Err(SessionError::InvalidExport(format!(
            "unsupported version {}",
            envelope.version
        )));
    }

    registry.put(&envelope.journey)?;
    Ok(envelope.journey)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journey::JourneyStep;
    use chrono::Utc;

    fn sample_journey() -> Journey {
        Journey {
            name: "deploy".to_string(),
            created_at: Utc::now(),
            steps: vec![
                JourneyStep::capture("make build", Some("ok\n".to_string()), 0),
                JourneyStep::capture("false", Some(String::new()), 1),
            ],
        }
    }

    #[test]
    fn test_roundtrip_reproduces_step_sequence() {
        let dir = tempfile::tempdir().unwrap();
        let registry = JourneyRegistry::open(&dir.path().join("journeys.db")).unwrap();
        let other = JourneyRegistry::open(&dir.path().join("other.db")).unwrap();

        let original = sample_journey();
        registry.put(&original).unwrap();

        let file = dir.path().join("deploy.journey.json");
        export_journey(&registry, "deploy", &file).unwrap();

        let imported = import_journey(&other, &file).unwrap();
        assert_eq!(imported.name, original.name);
        assert_eq!(imported.created_at, original.created_at);
        assert_eq!(imported.steps, original.steps, "step order and content must survive");
    }

    #[test]
    fn test_export_is_plain_json() {
        let dir = tempfile::tempdir().unwrap();
        let registry = JourneyRegistry::open(&dir.path().join("journeys.db")).unwrap();
        registry.put(&sample_journey()).unwrap();

        let file = dir.path().join("out.json");
        export_journey(&registry, "deploy", &file).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&file).unwrap()).unwrap();
        assert_eq!(value["format"], "moor-journey");
        assert_eq!(value["journey"]["steps"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_export_missing_journey() {
        let dir = tempfile::tempdir().unwrap();
        let registry = JourneyRegistry::open(&dir.path().join("journeys.db")).unwrap();

        assert!(matches!(
            export_journey(&registry, "absent", &dir.path().join("x.json")),
            Err(SessionError::NotFound(_))
        ));
    }

    #[test]
    fn test_import_rejects_wrong_format() {
        let dir = tempfile::tempdir().unwrap();
        let registry = JourneyRegistry::open(&dir.path().join("journeys.db")).unwrap();

        let file = dir.path().join("bad.json");
        std::fs::write(&file, r#"{"format":"moor-anchor","version":1,"journey":null}"#).unwrap();

        assert!(matches!(
            import_journey(&registry, &file),
            Err(SessionError::InvalidExport(_))
        ));
    }
}

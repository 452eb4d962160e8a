//! Self-describing export/import of anchor records
//!
//! Exports are versioned JSON envelopes carrying the full anchor record,
//! hashes as hex strings, so they round-trip losslessly and survive outside
//! any particular store. Blob content travels separately (opaque archive
//! transport); an imported anchor resolves blobs against its new store.

use crate::anchor::Anchor;
use crate::error::{AnchorError, Result};
use crate::registry::AnchorRegistry;
use serde::{Deserialize, Serialize};
use std::path::Path;

const FORMAT: &str = "moor-anchor";
const VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct AnchorEnvelope {
    format: String,
    version: u32,
    anchor: Anchor,
}

/// Export an anchor to a self-describing JSON file
pub fn export_anchor(registry: &AnchorRegistry, name: &str, output: &Path) -> Result<()> {
    let anchor = registry
        .get(name)?
        .ok_or_else(|| AnchorError::NotFound(name.to_string()))?;

    let envelope = AnchorEnvelope {
        format: FORMAT.to_string(),
        version: VERSION,
        anchor,
    };

    let json = serde_json::to_string_pretty(&envelope)
        .map_err(|e| AnchorError::InvalidExport(e.to_string()))?;
    std::fs::write(output, json).map_err(|e| AnchorError::io(output, e))?;

    Ok(())
}

/// Import an anchor from an export file, registering it under its own name
pub fn import_anchor(registry: &AnchorRegistry, file: &Path) -> Result<Anchor> {
    let content = std::fs::read_to_string(file).map_err(|e| AnchorError::io(file, e))?;

    let envelope: AnchorEnvelope = serde_json::from_str(&content)
        .map_err(|e| AnchorError::InvalidExport(e.to_string()))?;

    if envelope.format != FORMAT {
        return Err(AnchorError::InvalidExport(format!(
            "unexpected format '{}'",
            envelope.format
        )));
    }
    if envelope.version != VERSION {
        return Err(AnchorError::InvalidExport(format!(
            "unsupported version {}",
            envelope.version
        )));
    }

    registry.put(&envelope.anchor)?;
    Ok(envelope.anchor)
}

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use log::info;
use uuid::Uuid;

use crate::error::{PipelineError, Result};
use crate::record::RunBatch;

/// What the fetch step leaves behind for the insert step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandoffEnvelope {
    pub run_id: Uuid,
    pub fetched_at: DateTime<Utc>,
    pub records: RunBatch,
}

impl HandoffEnvelope {
    pub fn new(records: RunBatch) -> Self {
        HandoffEnvelope {
            run_id: Uuid::new_v4(),
            fetched_at: Utc::now(),
            records,
        }
    }
}

pub fn write_handoff(path: &Path, envelope: &HandoffEnvelope) -> Result<()> {
    let json = serde_json::to_string_pretty(envelope)
        .map_err(|e| handoff_error(path, format!("failed to serialize batch: {}", e)))?;

    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
        .map_err(|e| handoff_error(path, format!("failed to open for writing: {}", e)))?;

    file.write_all(json.as_bytes())
        .map_err(|e| handoff_error(path, format!("failed to write: {}", e)))?;

    info!("Handed off {} books (run {}) to {}", envelope.records.len(), envelope.run_id, path.display());
    Ok(())
}

pub fn read_handoff(path: &Path) -> Result<HandoffEnvelope> {
    if !path.exists() {
        return Err(handoff_error(path, "no handoff file found".to_string()));
    }
    let content = fs::read_to_string(path)
        .map_err(|e| handoff_error(path, format!("failed to read: {}", e)))?;
    let envelope: HandoffEnvelope = serde_json::from_str(&content)
        .map_err(|e| handoff_error(path, format!("failed to parse: {}", e)))?;

    info!("Picked up {} books from run {}", envelope.records.len(), envelope.run_id);
    Ok(envelope)
}

fn handoff_error(path: &Path, reason: String) -> PipelineError {
    PipelineError::Handoff {
        path: path.display().to_string(),
        reason,
    }
}

//! Serialized record sets passed between pipeline stages
//!
//! Every stage writes its complete output as one JSON document and the next
//! stage reads it back by value, so any stage can be re-run from the file its
//! predecessor left behind.

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::RfmError;

/// Stage names as recorded in snapshot headers.
pub mod stage {
    pub const METRICS: &str = "metrics";
    pub const SCORES: &str = "scores";
    pub const SEGMENTS: &str = "segments";
    pub const SUMMARY: &str = "summary";
}

/// A stage's full output with the name of the stage that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot<T> {
    pub stage: String,
    pub record_count: usize,
    pub records: Vec<T>,
}

impl<T> Snapshot<T> {
    pub fn new(stage: &str, records: Vec<T>) -> Self {
        Self {
            stage: stage.to_string(),
            record_count: records.len(),
            records,
        }
    }

    /// Unwrap the records, checking they came from `expected` and that the
    /// header count matches the records actually present.
    pub fn into_records(self, expected: &str) -> crate::Result<Vec<T>> {
        if self.stage != expected {
            return Err(RfmError::SnapshotStage {
                expected: expected.to_string(),
                found: self.stage,
            });
        }
        if self.record_count != self.records.len() {
            return Err(RfmError::SnapshotCount {
                stage: self.stage,
                declared: self.record_count,
                actual: self.records.len(),
            });
        }
        Ok(self.records)
    }
}

impl<T: Serialize> Snapshot<T> {
    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl<T: DeserializeOwned> Snapshot<T> {
    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Write `records` as a snapshot of `stage`.
pub fn write_snapshot<T: Serialize>(
    path: impl AsRef<Path>,
    stage: &str,
    records: &[T],
) -> crate::Result<()> {
    let path = path.as_ref();
    let snapshot = Snapshot::new(stage, records.iter().collect::<Vec<_>>());
    fs::write(path, snapshot.to_json()?)?;
    debug!(stage, records = records.len(), path = %path.display(), "wrote snapshot");
    Ok(())
}

/// Read the records of a snapshot that must have been written by `expected_stage`.
pub fn read_snapshot<T: DeserializeOwned>(
    path: impl AsRef<Path>,
    expected_stage: &str,
) -> crate::Result<Vec<T>> {
    let path = path.as_ref();
    let json = fs::read_to_string(path)?;
    let records = Snapshot::<T>::from_json(&json)?.into_records(expected_stage)?;
    debug!(stage = expected_stage, records = records.len(), path = %path.display(), "read snapshot");
    Ok(records)
}

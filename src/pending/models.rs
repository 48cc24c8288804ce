//! Pending update entries and errors

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

/// A single field edit waiting to be written to the record store.
///
/// Serialized with the stored field names (`taskId`, not `task_id`) so lists
/// written by other clients stay readable. Entries written before ids were
/// introduced get a fresh id on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingUpdate {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    /// Id of the record the edit targets (a task id for the task list)
    pub task_id: String,
    pub field: String,
    pub value: Value,
    pub timestamp: DateTime<Utc>,
}

impl PendingUpdate {
    /// Create a new entry stamped with the current time
    pub fn new(record_id: impl Into<String>, field: impl Into<String>, value: Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            task_id: record_id.into(),
            field: field.into(),
            value,
            timestamp: Utc::now(),
        }
    }
}

/// Errors from a pending change store
#[derive(Debug, Error)]
pub enum PendingStoreError {
    #[error("Failed to access pending updates at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode pending updates: {0}")]
    Encode(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_serializes_with_stored_field_names() {
        let update = PendingUpdate::new("t1", "status", json!("Done"));
        let value = serde_json::to_value(&update).unwrap();
        assert_eq!(value["taskId"], "t1");
        assert_eq!(value["field"], "status");
        assert!(value.get("task_id").is_none());
    }

    #[test]
    fn test_legacy_entry_without_id_gets_one() {
        let raw = json!({
            "taskId": "t1",
            "field": "progress",
            "value": 40,
            "timestamp": "2024-03-01T10:00:00Z"
        });
        let update: PendingUpdate = serde_json::from_value(raw).unwrap();
        assert_eq!(update.task_id, "t1");
        assert_eq!(update.value, json!(40));
        assert!(!update.id.is_nil());
    }
}

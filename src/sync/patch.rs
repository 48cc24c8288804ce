//! Typed single-field patches and the reducer that merges them

use crate::pending::PendingUpdate;
use crate::store::Record;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Fields a patch may never change
pub const PROTECTED_FIELDS: [&str; 2] = ["id", "createdAt"];

/// Field name of the modification timestamp
pub const UPDATED_AT: &str = "updatedAt";

/// Whether a patch may override `field`
pub fn is_patchable(field: &str) -> bool {
    !field.is_empty() && !PROTECTED_FIELDS.contains(&field)
}

/// One field of one record set to a new value at a point in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldPatch {
    pub record_id: String,
    pub field: String,
    pub value: Value,
    pub updated_at: DateTime<Utc>,
}

impl FieldPatch {
    /// Patch stamped with the current time
    pub fn new(record_id: impl Into<String>, field: impl Into<String>, value: Value) -> Self {
        Self {
            record_id: record_id.into(),
            field: field.into(),
            value,
            updated_at: Utc::now(),
        }
    }

    /// Replay a queued edit with a fresh timestamp
    pub fn from_pending(update: &PendingUpdate) -> Self {
        Self::new(update.task_id.clone(), update.field.clone(), update.value.clone())
    }

    /// Queue entry for this patch
    pub fn to_pending(&self) -> PendingUpdate {
        PendingUpdate {
            timestamp: self.updated_at,
            ..PendingUpdate::new(self.record_id.clone(), self.field.clone(), self.value.clone())
        }
    }

    fn timestamp(&self) -> Value {
        Value::String(self.updated_at.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    /// Body of the partial update sent to the store: the field plus a
    /// refreshed `updatedAt`
    pub fn to_fields(&self) -> Record {
        let mut fields = Record::new();
        fields.insert(self.field.clone(), self.value.clone());
        fields.insert(UPDATED_AT.to_string(), self.timestamp());
        fields
    }

    /// Locally constructed record `{id, [field]: value, updatedAt}`
    pub fn to_record(&self) -> Record {
        let mut record = self.to_fields();
        record.insert("id".to_string(), Value::String(self.record_id.clone()));
        record
    }

    /// Merge the patch into a read-model record.
    ///
    /// Returns `false`, leaving the record untouched, when the patch targets a
    /// protected field or another record.
    pub fn apply_to(&self, record: &mut Record) -> bool {
        if !is_patchable(&self.field) {
            return false;
        }
        if let Some(id) = crate::store::models::record_id(record) {
            if id != self.record_id {
                return false;
            }
        }
        record.insert(self.field.clone(), self.value.clone());
        record.insert(UPDATED_AT.to_string(), self.timestamp());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rec(v: Value) -> Record {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn test_optimistic_record_shape() {
        let patch = FieldPatch::new("t1", "status", json!("Done"));
        let record = patch.to_record();
        assert_eq!(record.len(), 3);
        assert_eq!(record["id"], "t1");
        assert_eq!(record["status"], "Done");
        assert!(record[UPDATED_AT].as_str().unwrap().ends_with('Z'));

        let fields = patch.to_fields();
        assert!(!fields.contains_key("id"));
    }

    #[test]
    fn test_apply_overrides_field_and_timestamp() {
        let mut record = rec(json!({
            "id": "t1",
            "title": "Old",
            "createdAt": "2024-01-01T00:00:00Z",
            "updatedAt": "2024-01-01T00:00:00Z"
        }));
        let patch = FieldPatch::new("t1", "title", json!("New"));
        assert!(patch.apply_to(&mut record));
        assert_eq!(record["title"], "New");
        assert_ne!(record["updatedAt"], "2024-01-01T00:00:00Z");
        assert_eq!(record["createdAt"], "2024-01-01T00:00:00Z");
    }

    #[test]
    fn test_protected_fields_are_refused() {
        let original = rec(json!({"id": "t1", "createdAt": "2024-01-01T00:00:00Z"}));
        for field in PROTECTED_FIELDS {
            let mut record = original.clone();
            let patch = FieldPatch::new("t1", field, json!("hijack"));
            assert!(!patch.apply_to(&mut record));
            assert_eq!(record, original);
        }
        assert!(!is_patchable(""));
        assert!(is_patchable("parentId"));
    }

    #[test]
    fn test_patch_for_other_record_is_refused() {
        let mut record = rec(json!({"id": "t2", "title": "Keep"}));
        assert!(!FieldPatch::new("t1", "title", json!("Lose")).apply_to(&mut record));
        assert_eq!(record["title"], "Keep");
    }

    #[test]
    fn test_pending_roundtrip_keeps_edit() {
        let patch = FieldPatch::new("t9", "progress", json!(80));
        let pending = patch.to_pending();
        assert_eq!(pending.task_id, "t9");
        assert_eq!(pending.timestamp, patch.updated_at);

        let replay = FieldPatch::from_pending(&pending);
        assert_eq!(replay.record_id, "t9");
        assert_eq!(replay.field, "progress");
        assert_eq!(replay.value, json!(80));
    }
}

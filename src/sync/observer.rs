//! Observers notified by the field update controller

use super::patch::FieldPatch;
use crate::store::models::record_id;
use crate::store::{Record, Table};
use crate::tasks::models::TaskRecord;
use std::sync::{PoisonError, RwLock};
use tracing::{info, warn};

/// A change to report to the view layer
#[derive(Debug, Clone, PartialEq)]
pub enum RecordUpdate {
    /// Record as returned by the store after a successful write
    Confirmed(Record),
    /// Edit applied locally while the store write is still pending
    Optimistic(FieldPatch),
}

impl RecordUpdate {
    /// Id of the affected record
    pub fn record_id(&self) -> Option<String> {
        match self {
            RecordUpdate::Confirmed(record) => record_id(record),
            RecordUpdate::Optimistic(patch) => Some(patch.record_id.clone()),
        }
    }

    /// The record to show: the confirmed record, or `{id, [field], updatedAt}`
    pub fn record(&self) -> Record {
        match self {
            RecordUpdate::Confirmed(record) => record.clone(),
            RecordUpdate::Optimistic(patch) => patch.to_record(),
        }
    }

    pub fn is_optimistic(&self) -> bool {
        matches!(self, RecordUpdate::Optimistic(_))
    }
}

/// Receives the outcome of field updates.
///
/// Callbacks run synchronously on the updating task and must not block.
pub trait UpdateObserver: Send + Sync {
    /// A record changed, either confirmed by the store or optimistically
    fn on_record_updated(&self, table: Table, update: &RecordUpdate);

    /// An edit was queued locally because the store write failed
    fn on_saved_locally(&self, table: Table, message: &str);

    /// An edit was refused before reaching the store
    fn on_error(&self, table: Table, message: &str);
}

/// Observer that only logs
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl UpdateObserver for TracingObserver {
    fn on_record_updated(&self, table: Table, update: &RecordUpdate) {
        info!(
            table = %table,
            id = update.record_id().as_deref().unwrap_or("?"),
            optimistic = update.is_optimistic(),
            "Record updated"
        );
    }

    fn on_saved_locally(&self, table: Table, message: &str) {
        warn!(table = %table, "{}", message);
    }

    fn on_error(&self, table: Table, message: &str) {
        warn!(table = %table, "Update error: {}", message);
    }
}

/// In-memory view of one table's records, kept current by update callbacks.
///
/// Confirmed records are merged field by field over the existing record (the
/// store may answer with only the changed fields); optimistic patches go
/// through [`FieldPatch::apply_to`]. Records keep their load order.
pub struct ReadModel {
    table: Table,
    records: RwLock<Vec<Record>>,
    notices: RwLock<Vec<String>>,
    errors: RwLock<Vec<String>>,
}

impl ReadModel {
    pub fn new(table: Table, records: Vec<Record>) -> Self {
        Self {
            table,
            records: RwLock::new(records),
            notices: RwLock::new(Vec::new()),
            errors: RwLock::new(Vec::new()),
        }
    }

    /// Replace every record, e.g. after reloading the table
    pub fn reset(&self, records: Vec<Record>) {
        *self.records.write().unwrap_or_else(PoisonError::into_inner) = records;
    }

    pub fn snapshot(&self) -> Vec<Record> {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn get(&self, id: &str) -> Option<Record> {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|r| record_id(r).as_deref() == Some(id))
            .cloned()
    }

    /// "Saved locally" messages received so far
    pub fn notices(&self) -> Vec<String> {
        self.notices
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Refusals received so far
    pub fn errors(&self) -> Vec<String> {
        self.errors
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Decode every record as a task, skipping undecodable ones
    pub fn tasks(&self) -> Vec<TaskRecord> {
        self.snapshot()
            .iter()
            .filter_map(|r| match TaskRecord::from_record(r) {
                Ok(task) => Some(task),
                Err(e) => {
                    warn!(table = %self.table, "Skipping record: {}", e);
                    None
                }
            })
            .collect()
    }

    /// Apply an update to the view
    pub fn apply(&self, update: &RecordUpdate) {
        let Some(id) = update.record_id() else {
            warn!(table = %self.table, "Ignoring update without a record id");
            return;
        };
        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
        let existing = records
            .iter_mut()
            .find(|r| record_id(r).as_deref() == Some(id.as_str()));

        match (existing, update) {
            (Some(record), RecordUpdate::Confirmed(confirmed)) => {
                for (key, value) in confirmed {
                    if key != "id" {
                        record.insert(key.clone(), value.clone());
                    }
                }
            }
            (Some(record), RecordUpdate::Optimistic(patch)) => {
                if !patch.apply_to(record) {
                    warn!(table = %self.table, field = %patch.field, "Patch refused by read model");
                }
            }
            (None, update) => records.push(update.record()),
        }
    }
}

impl UpdateObserver for ReadModel {
    fn on_record_updated(&self, table: Table, update: &RecordUpdate) {
        if table == self.table {
            self.apply(update);
        }
    }

    fn on_saved_locally(&self, table: Table, message: &str) {
        if table == self.table {
            self.notices
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .push(message.to_string());
        }
    }

    fn on_error(&self, table: Table, message: &str) {
        if table == self.table {
            self.errors
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .push(message.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn rec(v: Value) -> Record {
        v.as_object().cloned().unwrap()
    }

    fn model() -> ReadModel {
        ReadModel::new(
            Table::Tasks,
            vec![
                rec(json!({"id": "1", "title": "One", "progress": 0})),
                rec(json!({"id": "2", "title": "Two"})),
            ],
        )
    }

    #[test]
    fn test_confirmed_update_merges_fields() {
        let model = model();
        model.on_record_updated(
            Table::Tasks,
            &RecordUpdate::Confirmed(rec(json!({"id": "1", "progress": 40}))),
        );
        let one = model.get("1").unwrap();
        assert_eq!(one["title"], "One");
        assert_eq!(one["progress"], 40);
    }

    #[test]
    fn test_optimistic_update_uses_reducer() {
        let model = model();
        let patch = FieldPatch::new("2", "title", json!("Renamed"));
        model.on_record_updated(Table::Tasks, &RecordUpdate::Optimistic(patch));
        assert_eq!(model.get("2").unwrap()["title"], "Renamed");

        let refused = FieldPatch::new("2", "id", json!("3"));
        model.on_record_updated(Table::Tasks, &RecordUpdate::Optimistic(refused));
        assert!(model.get("2").is_some());
        assert!(model.get("3").is_none());
    }

    #[test]
    fn test_unknown_record_is_appended() {
        let model = model();
        let patch = FieldPatch::new("9", "title", json!("New"));
        model.on_record_updated(Table::Tasks, &RecordUpdate::Optimistic(patch));
        let ids: Vec<String> = model.snapshot().iter().filter_map(record_id).collect();
        assert_eq!(ids, vec!["1", "2", "9"]);
    }

    #[test]
    fn test_other_tables_are_ignored() {
        let model = model();
        model.on_record_updated(
            Table::Projects,
            &RecordUpdate::Confirmed(rec(json!({"id": "1", "title": "Project"}))),
        );
        model.on_saved_locally(Table::Projects, "queued");
        assert_eq!(model.get("1").unwrap()["title"], "One");
        assert!(model.notices().is_empty());
    }

    #[test]
    fn test_tasks_are_decoded_in_order() {
        let model = model();
        model.on_saved_locally(Table::Tasks, "queued");
        model.on_error(Table::Tasks, "refused");
        let ids: Vec<String> = model.tasks().into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec!["1", "2"]);
        assert_eq!(model.notices(), vec!["queued"]);
        assert_eq!(model.errors(), vec!["refused"]);
    }
}

//! In-memory mock implementation of RecordStore for testing without a real
//! record service.
//!
//! Records live in `Vec`s behind async `RwLock`s, one per table, so list order
//! is insertion order. Failures can be injected for the whole store
//! (`set_offline`) or for individual record ids (`fail_id`).

use super::error::StoreError;
use super::models::{now_timestamp, record_id, Record};
use super::tables::Table;
use super::traits::RecordStore;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::RwLock;
use uuid::Uuid;

/// In-memory mock implementation of RecordStore for testing.
pub struct MockRecordStore {
    tables: RwLock<HashMap<Table, Vec<Record>>>,
    failing_ids: RwLock<HashSet<String>>,
    offline: AtomicBool,
    update_calls: AtomicUsize,
}

impl MockRecordStore {
    /// Create a new empty mock store.
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
            failing_ids: RwLock::new(HashSet::new()),
            offline: AtomicBool::new(false),
            update_calls: AtomicUsize::new(0),
        }
    }

    /// Seed a table with records, bypassing failure injection
    pub async fn seed(&self, table: Table, records: Vec<Record>) {
        self.tables
            .write()
            .await
            .entry(table)
            .or_default()
            .extend(records);
    }

    /// Make every call fail with a network-like status error
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Make calls that address `id` fail
    pub async fn fail_id(&self, id: &str) {
        self.failing_ids.write().await.insert(id.to_string());
    }

    /// Stop failing calls that address `id`
    pub async fn heal_id(&self, id: &str) {
        self.failing_ids.write().await.remove(id);
    }

    /// Number of `update` calls received, failed ones included
    pub fn update_calls(&self) -> usize {
        self.update_calls.load(Ordering::SeqCst)
    }

    /// Snapshot of a stored record
    pub async fn record(&self, table: Table, id: &str) -> Option<Record> {
        self.tables
            .read()
            .await
            .get(&table)?
            .iter()
            .find(|r| record_id(r).as_deref() == Some(id))
            .cloned()
    }

    async fn check(&self, id: Option<&str>) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Status {
                status: 503,
                message: "mock store offline".into(),
            });
        }
        if let Some(id) = id {
            if self.failing_ids.read().await.contains(id) {
                return Err(StoreError::Status {
                    status: 500,
                    message: format!("mock failure for {}", id),
                });
            }
        }
        Ok(())
    }

    fn not_found(table: Table, id: &str) -> StoreError {
        StoreError::NotFound {
            table: table.name().to_string(),
            id: id.to_string(),
        }
    }
}

impl Default for MockRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecordStore for MockRecordStore {
    async fn create(&self, table: Table, mut record: Record) -> Result<Record, StoreError> {
        let id = record_id(&record).unwrap_or_else(|| Uuid::new_v4().to_string());
        self.check(Some(&id)).await?;

        record.insert("id".into(), Value::String(id));
        let now = now_timestamp();
        record
            .entry("createdAt")
            .or_insert_with(|| Value::String(now.clone()));
        record.entry("updatedAt").or_insert_with(|| Value::String(now));

        self.tables
            .write()
            .await
            .entry(table)
            .or_default()
            .push(record.clone());
        Ok(record)
    }

    async fn list(&self, table: Table) -> Result<Vec<Record>, StoreError> {
        self.check(None).await?;
        Ok(self
            .tables
            .read()
            .await
            .get(&table)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_by_id(&self, table: Table, id: &str) -> Result<Record, StoreError> {
        self.check(Some(id)).await?;
        self.record(table, id)
            .await
            .ok_or_else(|| Self::not_found(table, id))
    }

    async fn update(&self, table: Table, id: &str, fields: Record) -> Result<Record, StoreError> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        self.check(Some(id)).await?;

        let mut tables = self.tables.write().await;
        let existing = tables
            .get_mut(&table)
            .and_then(|records| {
                records
                    .iter_mut()
                    .find(|r| record_id(r).as_deref() == Some(id))
            })
            .ok_or_else(|| Self::not_found(table, id))?;

        for (key, value) in fields {
            if key != "id" {
                existing.insert(key, value);
            }
        }
        Ok(existing.clone())
    }

    async fn delete(&self, table: Table, id: &str) -> Result<(), StoreError> {
        self.check(Some(id)).await?;

        let mut tables = self.tables.write().await;
        let records = tables
            .get_mut(&table)
            .ok_or_else(|| Self::not_found(table, id))?;
        let before = records.len();
        records.retain(|r| record_id(r).as_deref() != Some(id));
        if records.len() == before {
            return Err(Self::not_found(table, id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rec(v: Value) -> Record {
        v.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_create_assigns_id_and_timestamps() {
        let store = MockRecordStore::new();
        let created = store
            .create(Table::Tasks, rec(json!({"title": "A"})))
            .await
            .unwrap();
        assert!(record_id(&created).is_some());
        assert!(created.contains_key("createdAt"));
        assert_eq!(store.list(Table::Tasks).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_merges_fields() {
        let store = MockRecordStore::new();
        store
            .seed(Table::Tasks, vec![rec(json!({"id": "1", "title": "A", "progress": 0}))])
            .await;
        let updated = store
            .update(Table::Tasks, "1", rec(json!({"progress": 50, "id": "other"})))
            .await
            .unwrap();
        assert_eq!(updated["title"], "A");
        assert_eq!(updated["progress"], 50);
        assert_eq!(updated["id"], "1");
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let store = MockRecordStore::new();
        store.seed(Table::Tasks, vec![rec(json!({"id": "1"}))]).await;

        store.fail_id("1").await;
        assert!(store.update(Table::Tasks, "1", Record::new()).await.is_err());
        store.heal_id("1").await;
        assert!(store.update(Table::Tasks, "1", Record::new()).await.is_ok());

        store.set_offline(true);
        assert!(store.list(Table::Tasks).await.is_err());
        assert_eq!(store.update_calls(), 2);
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_found() {
        let store = MockRecordStore::new();
        let err = store.delete(Table::Projects, "nope").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }
}

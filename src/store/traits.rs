//! Trait abstraction for record store operations

use super::error::StoreError;
use super::models::Record;
use super::tables::Table;
use async_trait::async_trait;

/// Generic CRUD operations against named tables.
///
/// Implemented by [`HttpRecordStore`](super::HttpRecordStore) for the real
/// service and by an in-memory mock in tests.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Create a record. An `id` is generated client-side when the record has
    /// none; the stored record is returned.
    async fn create(&self, table: Table, record: Record) -> Result<Record, StoreError>;

    /// List every record in a table
    async fn list(&self, table: Table) -> Result<Vec<Record>, StoreError>;

    /// Get a record by id
    async fn get_by_id(&self, table: Table, id: &str) -> Result<Record, StoreError>;

    /// Partially update a record; only the given fields change.
    /// Returns the record as confirmed by the store.
    async fn update(&self, table: Table, id: &str, fields: Record) -> Result<Record, StoreError>;

    /// Delete a record by id
    async fn delete(&self, table: Table, id: &str) -> Result<(), StoreError>;
}

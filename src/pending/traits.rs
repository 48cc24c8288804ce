//! Trait abstraction for pending change storage

use super::models::{PendingStoreError, PendingUpdate};
use async_trait::async_trait;
use uuid::Uuid;

/// Ordered, append-only storage of pending updates, one list per key.
#[async_trait]
pub trait PendingChangeStore: Send + Sync {
    /// Append an entry to the end of the list under `key`
    async fn append(&self, key: &str, update: PendingUpdate) -> Result<(), PendingStoreError>;

    /// All entries under `key`, oldest first
    async fn list(&self, key: &str) -> Result<Vec<PendingUpdate>, PendingStoreError>;

    /// Remove one entry by id. Returns whether an entry was removed.
    async fn remove_by_id(&self, key: &str, id: Uuid) -> Result<bool, PendingStoreError>;
}

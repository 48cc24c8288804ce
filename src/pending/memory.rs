//! In-memory pending change store

use super::models::{PendingStoreError, PendingUpdate};
use super::traits::PendingChangeStore;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Pending change store that lives only as long as the process.
#[derive(Default)]
pub struct InMemoryPendingStore {
    lists: RwLock<HashMap<String, Vec<PendingUpdate>>>,
}

impl InMemoryPendingStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PendingChangeStore for InMemoryPendingStore {
    async fn append(&self, key: &str, update: PendingUpdate) -> Result<(), PendingStoreError> {
        self.lists
            .write()
            .await
            .entry(key.to_string())
            .or_default()
            .push(update);
        Ok(())
    }

    async fn list(&self, key: &str) -> Result<Vec<PendingUpdate>, PendingStoreError> {
        Ok(self.lists.read().await.get(key).cloned().unwrap_or_default())
    }

    async fn remove_by_id(&self, key: &str, id: Uuid) -> Result<bool, PendingStoreError> {
        let mut lists = self.lists.write().await;
        let Some(list) = lists.get_mut(key) else {
            return Ok(false);
        };
        let before = list.len();
        list.retain(|u| u.id != id);
        Ok(list.len() != before)
    }
}

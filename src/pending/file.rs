//! File-backed pending change store
//!
//! Each key is a JSON array in `<dir>/<key>.json`. Writes go to a temp file
//! that is then renamed over the list, and the whole read-modify-write cycle
//! runs under one async mutex.

use super::models::{PendingStoreError, PendingUpdate};
use super::traits::PendingChangeStore;
use async_trait::async_trait;
use chrono::Utc;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

/// Pending change store persisted as JSON files under a directory.
pub struct FilePendingStore {
    dir: PathBuf,
    lock: Mutex<()>,
}

impl FilePendingStore {
    /// Store lists under `dir`; the directory is created on first write
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            lock: Mutex::new(()),
        }
    }

    /// Directory holding the list files
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file backing `key`
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", sanitize_key(key)))
    }

    async fn read(&self, key: &str) -> Result<Vec<PendingUpdate>, PendingStoreError> {
        let path = self.path_for(key);
        let contents = match tokio::fs::read_to_string(&path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(PendingStoreError::Io { path, source }),
        };

        match decode_list(&contents) {
            Ok((list, false)) => Ok(list),
            Ok((list, true)) => {
                // Entries written without an id get one now; persist it so
                // later removals can find them
                debug!(path = %path.display(), "Assigning ids to legacy pending updates");
                self.write(key, &list).await?;
                Ok(list)
            }
            Err(e) => {
                // Keep the unreadable file for inspection instead of overwriting it
                let aside = path.with_extension(format!("corrupt-{}", Utc::now().timestamp()));
                warn!(
                    path = %path.display(),
                    moved_to = %aside.display(),
                    "Pending update list is unreadable, starting empty: {}",
                    e
                );
                if let Err(source) = tokio::fs::rename(&path, &aside).await {
                    return Err(PendingStoreError::Io { path, source });
                }
                Ok(Vec::new())
            }
        }
    }

    async fn write(&self, key: &str, list: &[PendingUpdate]) -> Result<(), PendingStoreError> {
        let path = self.path_for(key);
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| PendingStoreError::Io {
                path: self.dir.clone(),
                source,
            })?;

        let data = serde_json::to_string_pretty(list)?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, data)
            .await
            .map_err(|source| PendingStoreError::Io {
                path: tmp.clone(),
                source,
            })?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|source| PendingStoreError::Io {
                path: path.clone(),
                source,
            })?;

        debug!(path = %path.display(), entries = list.len(), "Wrote pending updates");
        Ok(())
    }
}

/// Parse a stored list, reporting whether any entry lacked an id
fn decode_list(contents: &str) -> Result<(Vec<PendingUpdate>, bool), serde_json::Error> {
    let items: Vec<serde_json::Value> = serde_json::from_str(contents)?;
    let missing_ids = items.iter().any(|item| item.get("id").is_none());
    let list = serde_json::from_value(serde_json::Value::Array(items))?;
    Ok((list, missing_ids))
}

/// Keep keys usable as file names
fn sanitize_key(key: &str) -> String {
    let cleaned: String = key
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "pending".to_string()
    } else {
        cleaned
    }
}

#[async_trait]
impl PendingChangeStore for FilePendingStore {
    async fn append(&self, key: &str, update: PendingUpdate) -> Result<(), PendingStoreError> {
        let _guard = self.lock.lock().await;
        let mut list = self.read(key).await?;
        list.push(update);
        self.write(key, &list).await
    }

    async fn list(&self, key: &str) -> Result<Vec<PendingUpdate>, PendingStoreError> {
        let _guard = self.lock.lock().await;
        self.read(key).await
    }

    async fn remove_by_id(&self, key: &str, id: Uuid) -> Result<bool, PendingStoreError> {
        let _guard = self.lock.lock().await;
        let mut list = self.read(key).await?;
        let before = list.len();
        list.retain(|u| u.id != id);
        if list.len() == before {
            return Ok(false);
        }
        self.write(key, &list).await?;
        Ok(true)
    }
}

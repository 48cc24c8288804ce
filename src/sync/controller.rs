//! Optimistic single-field updates backed by a durable pending queue.
//!
//! A field edit is sent to the record store as a partial update. When the
//! store call fails for any reason the edit is queued in the
//! [`PendingChangeStore`] under the table's key and the observer still
//! receives the edited record, so the caller never sees the failure.
//! [`FieldUpdateController::retry_failed_updates`] replays the queue later.

use super::observer::{RecordUpdate, UpdateObserver};
use super::patch::{is_patchable, FieldPatch};
use crate::pending::{PendingChangeStore, PendingStoreError, PendingUpdate};
use crate::store::{RecordStore, Table};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Notice passed to the observer when an edit was queued locally
pub const SAVED_LOCALLY_MESSAGE: &str =
    "Changes saved locally. They will sync when the connection is restored.";

/// Outcome of a replay of the pending queue
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RetryReport {
    /// Entries read from the queue
    pub attempted: usize,
    /// Entries accepted by the store and removed from the queue
    pub synced: usize,
    /// Entries still queued after the replay
    pub remaining: usize,
}

/// Sends field edits for one table and keeps failed ones queued
pub struct FieldUpdateController {
    store: Arc<dyn RecordStore>,
    pending: Arc<dyn PendingChangeStore>,
    observer: Arc<dyn UpdateObserver>,
    table: Table,
}

impl FieldUpdateController {
    pub fn new(
        store: Arc<dyn RecordStore>,
        pending: Arc<dyn PendingChangeStore>,
        observer: Arc<dyn UpdateObserver>,
        table: Table,
    ) -> Self {
        Self {
            store,
            pending,
            observer,
            table,
        }
    }

    pub fn table(&self) -> Table {
        self.table
    }

    /// Set `field` of record `id` to `value`.
    ///
    /// Returns `false` only when the edit is refused up front (empty id or a
    /// protected field). Store failures are absorbed: the edit is queued and
    /// the observer receives an optimistic record. If the queue itself cannot
    /// be written the observer gets an error instead of the saved notice.
    pub async fn update_field(&self, id: &str, field: &str, value: Value) -> bool {
        if id.trim().is_empty() {
            let message = format!("Cannot update {}: missing id", self.table.entity_label());
            error!(table = %self.table, field, "{}", message);
            self.observer.on_error(self.table, &message);
            return false;
        }
        if !is_patchable(field) {
            let message = format!("Field '{}' cannot be updated", field);
            error!(table = %self.table, id, "{}", message);
            self.observer.on_error(self.table, &message);
            return false;
        }

        let patch = FieldPatch::new(id, field, value);
        match self
            .store
            .update(self.table, id, patch.to_fields())
            .await
        {
            Ok(confirmed) => {
                debug!(table = %self.table, id, field, "Field update confirmed");
                self.observer
                    .on_record_updated(self.table, &RecordUpdate::Confirmed(confirmed));
            }
            Err(e) => {
                warn!(
                    table = %self.table,
                    id,
                    field,
                    error = %e,
                    "Field update failed, queueing locally"
                );
                let queued = self
                    .pending
                    .append(self.table.pending_key(), patch.to_pending())
                    .await;
                self.observer
                    .on_record_updated(self.table, &RecordUpdate::Optimistic(patch));
                match queued {
                    Ok(()) => self
                        .observer
                        .on_saved_locally(self.table, SAVED_LOCALLY_MESSAGE),
                    Err(pe) => {
                        error!(table = %self.table, id, error = %pe, "Failed to queue pending update");
                        self.observer.on_error(
                            self.table,
                            &format!("Changes could not be saved locally: {}", pe),
                        );
                    }
                }
            }
        }
        true
    }

    /// Edits queued for this table, oldest first
    pub async fn pending_updates(&self) -> Result<Vec<PendingUpdate>, PendingStoreError> {
        self.pending.list(self.table.pending_key()).await
    }

    /// Replay every queued edit in order.
    ///
    /// Each entry is removed as soon as the store accepts it, so a replay that
    /// stops halfway keeps its progress. Entries the store still rejects stay
    /// queued for the next call.
    pub async fn retry_failed_updates(&self) -> Result<RetryReport, PendingStoreError> {
        let key = self.table.pending_key();
        let queued = self.pending.list(key).await?;
        let mut report = RetryReport {
            attempted: queued.len(),
            ..Default::default()
        };

        for entry in queued {
            let patch = FieldPatch::from_pending(&entry);
            match self
                .store
                .update(self.table, &entry.task_id, patch.to_fields())
                .await
            {
                Ok(confirmed) => {
                    if self.pending.remove_by_id(key, entry.id).await? {
                        report.synced += 1;
                    } else {
                        warn!(
                            table = %self.table,
                            id = %entry.task_id,
                            entry = %entry.id,
                            "Replayed update was not found in the queue"
                        );
                        report.remaining += 1;
                    }
                    self.observer
                        .on_record_updated(self.table, &RecordUpdate::Confirmed(confirmed));
                }
                Err(e) => {
                    warn!(
                        table = %self.table,
                        id = %entry.task_id,
                        field = %entry.field,
                        error = %e,
                        "Pending update still failing"
                    );
                    report.remaining += 1;
                }
            }
        }

        if report.attempted > 0 {
            info!(
                table = %self.table,
                attempted = report.attempted,
                synced = report.synced,
                remaining = report.remaining,
                "Replayed pending updates"
            );
        }
        Ok(report)
    }
}

//! Test helper factories and mock state builders
//!
//! Provides convenience functions for creating test records with sensible
//! defaults, and helpers for building a mock AppState.
#![allow(dead_code)]

use crate::pending::InMemoryPendingStore;
use crate::store::mock::MockRecordStore;
use crate::store::Record;
use crate::sync::TracingObserver;
use crate::tasks::models::{TaskRecord, UiTask};
use crate::tasks::normalize::transform_task_to_ui;
use crate::{AppState, Config};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// Mock state builders
// ============================================================================

/// Config pointing at nothing; mock backends never read it
pub fn test_config() -> Config {
    Config {
        store_url: "http://mock:3001/api".to_string(),
        store_token: None,
        store_timeout: Duration::from_secs(1),
        pending_dir: PathBuf::from("/tmp/pm-test-pending"),
    }
}

/// Create a mock AppState with empty in-memory backends. The mock store is
/// returned as well so tests can seed it and inject failures.
pub fn mock_app_state() -> (AppState, Arc<MockRecordStore>) {
    let store = Arc::new(MockRecordStore::new());
    let state = AppState::with_backends(
        test_config(),
        store.clone(),
        Arc::new(InMemoryPendingStore::new()),
        Arc::new(TracingObserver),
    );
    (state, store)
}

// ============================================================================
// Test data factories
// ============================================================================

/// Convert a JSON object literal to a record
pub fn record(value: Value) -> Record {
    match value {
        Value::Object(map) => map,
        other => panic!("expected a JSON object, got {}", other),
    }
}

/// Stored task record with an optional parent
pub fn task_record(id: &str, title: &str, parent_id: Option<&str>) -> Record {
    record(json!({
        "id": id,
        "title": title,
        "status": "To Do",
        "priority": "Medium",
        "parentId": parent_id,
        "createdAt": "2024-01-01T00:00:00.000Z",
        "updatedAt": "2024-01-01T00:00:00.000Z",
    }))
}

/// UI task with an optional project reference
pub fn ui_task(id: &str, project: Option<&str>) -> UiTask {
    let mut task = TaskRecord::new(id, format!("Task {}", id));
    task.project = project.map(str::to_string);
    transform_task_to_ui(&task)
}

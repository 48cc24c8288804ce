//! Stored task record -> UI task
//!
//! The transform is total: every missing or unreadable field is replaced with
//! its default, and parse failures are logged, never returned.

use super::models::{Subtask, TaskRecord, UiTask};
use crate::store::decode::{split_comma_list, DecodeError};
use chrono::Utc;
use serde_json::Value;
use tracing::warn;

/// Title used when a record has neither `title` nor `name`
pub const UNTITLED_TASK: &str = "Untitled Task";

/// Fill in defaults and expand the encoded list fields of a stored task.
pub fn transform_task_to_ui(task: &TaskRecord) -> UiTask {
    let now = Utc::now();
    let today = now.date_naive();
    let estimated_hours = task.estimated_hours.unwrap_or(0.0);

    UiTask {
        id: task.id.clone(),
        title: task
            .title
            .clone()
            .or_else(|| task.name.clone())
            .unwrap_or_else(|| UNTITLED_TASK.to_string()),
        description: task.description.clone().unwrap_or_default(),
        project: task.project.clone().unwrap_or_default(),
        assignee: task.assignee.clone().unwrap_or_default(),
        status: task.status,
        priority: task.priority,
        start_date: task.start_date.unwrap_or(today),
        due_date: task.due_date.unwrap_or(today),
        estimated_hours,
        estimated_time: format_hours(estimated_hours),
        time_spent: task
            .time_spent
            .clone()
            .unwrap_or_else(|| "0h".to_string()),
        tags: task
            .tags
            .as_deref()
            .map(split_comma_list)
            .unwrap_or_default(),
        subtasks: task
            .subtasks
            .as_deref()
            .map(|raw| parse_subtasks(&task.id, raw))
            .unwrap_or_default(),
        comments: task.comments.clone().unwrap_or_default(),
        progress: task.progress.unwrap_or(0),
        parent_id: task.parent_id.clone(),
        created_at: task.created_at.unwrap_or(now),
        updated_at: task.updated_at.unwrap_or(now),
    }
}

/// Decode and transform a raw JSON record. Fails only when the value is not
/// an object or carries no id.
pub fn transform_value_to_ui(value: &Value) -> Result<UiTask, DecodeError> {
    TaskRecord::from_value(value).map(|task| transform_task_to_ui(&task))
}

/// Transform a batch of raw records. Records that cannot be decoded are
/// logged and skipped; the rest keep their input order.
pub fn normalize_task_values(values: &[Value]) -> Vec<UiTask> {
    values
        .iter()
        .enumerate()
        .filter_map(|(index, value)| match transform_value_to_ui(value) {
            Ok(task) => Some(task),
            Err(e) => {
                warn!(index, "Skipping task record: {}", e);
                None
            }
        })
        .collect()
}

/// `"{hours}h"`, or `"0h"` when no estimate is set
pub fn format_hours(hours: f64) -> String {
    if hours != 0.0 && hours.is_finite() {
        format!("{}h", hours)
    } else {
        "0h".to_string()
    }
}

/// Parse the JSON-encoded subtask list. Anything other than a JSON array
/// yields an empty list; array entries that are not subtasks are skipped.
pub fn parse_subtasks(task_id: &str, raw: &str) -> Vec<Subtask> {
    if raw.trim().is_empty() {
        return Vec::new();
    }
    let items = match serde_json::from_str::<Value>(raw) {
        Ok(Value::Array(items)) => items,
        Ok(_) => {
            warn!(task_id, "Subtasks field is not a list, ignoring");
            return Vec::new();
        }
        Err(e) => {
            warn!(task_id, "Failed to parse subtasks: {}", e);
            return Vec::new();
        }
    };

    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<Subtask>(item) {
            Ok(subtask) => Some(subtask),
            Err(e) => {
                warn!(task_id, "Skipping malformed subtask: {}", e);
                None
            }
        })
        .collect()
}

/// Encode subtasks in the stored (JSON text) format
pub fn encode_subtasks(subtasks: &[Subtask]) -> String {
    // Serializing plain structs of strings/ints/bools cannot fail
    serde_json::to_string(subtasks).unwrap_or_else(|_| "[]".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::models::{SubtaskId, TaskStatus};
    use serde_json::json;

    #[test]
    fn test_embedded_subtasks_are_parsed() {
        let ui = transform_value_to_ui(&json!({
            "id": "1",
            "title": "X",
            "subtasks": "[{\"id\":1,\"title\":\"a\",\"completed\":false}]"
        }))
        .unwrap();
        assert_eq!(
            ui.subtasks,
            vec![Subtask {
                id: SubtaskId::Number(1),
                title: "a".into(),
                completed: false,
            }]
        );
    }

    #[test]
    fn test_invalid_subtasks_become_empty() {
        let ui = transform_value_to_ui(&json!({"id": "1", "subtasks": "not json"})).unwrap();
        assert!(ui.subtasks.is_empty());

        let ui = transform_value_to_ui(&json!({"id": "1", "subtasks": "{\"id\":1}"})).unwrap();
        assert!(ui.subtasks.is_empty());
    }

    #[test]
    fn test_malformed_subtask_entries_are_skipped() {
        let subtasks = parse_subtasks("t", r#"[{"id":"s1","title":"ok"}, 5, {"title":"no id"}]"#);
        assert_eq!(subtasks.len(), 1);
        assert_eq!(subtasks[0].id, SubtaskId::Text("s1".into()));
        assert!(!subtasks[0].completed);
    }

    #[test]
    fn test_defaults_for_minimal_record() {
        let today = Utc::now().date_naive();
        let ui = transform_value_to_ui(&json!({"id": "only-id"})).unwrap();
        assert_eq!(ui.title, UNTITLED_TASK);
        assert!(ui.tags.is_empty());
        assert!(ui.subtasks.is_empty());
        assert_eq!(ui.progress, 0);
        assert_eq!(ui.estimated_hours, 0.0);
        assert_eq!(ui.estimated_time, "0h");
        assert_eq!(ui.time_spent, "0h");
        assert_eq!(ui.status, TaskStatus::ToDo);
        assert_eq!(ui.start_date, today);
        assert_eq!(ui.due_date, today);
        assert_eq!(ui.parent_id, None);
    }

    #[test]
    fn test_legacy_name_is_used_as_title() {
        let ui = transform_value_to_ui(&json!({"id": "1", "name": "Legacy"})).unwrap();
        assert_eq!(ui.title, "Legacy");

        let ui = transform_value_to_ui(&json!({"id": "1", "title": "", "name": "Legacy"})).unwrap();
        assert_eq!(ui.title, "Legacy");

        let ui = transform_value_to_ui(&json!({"id": "1", "title": "New", "name": "Legacy"})).unwrap();
        assert_eq!(ui.title, "New");
    }

    #[test]
    fn test_tags_and_estimate() {
        let ui = transform_value_to_ui(&json!({
            "id": "1",
            "tags": "frontend,, ux ,",
            "estimatedHours": 2.5,
            "timeSpent": "1h"
        }))
        .unwrap();
        assert_eq!(ui.tags, vec!["frontend", "ux"]);
        assert_eq!(ui.estimated_time, "2.5h");
        assert_eq!(ui.time_spent, "1h");

        assert_eq!(format_hours(8.0), "8h");
        assert_eq!(format_hours(0.0), "0h");
    }

    #[test]
    fn test_any_object_with_id_never_fails() {
        let weird = [
            json!({"id": "1", "progress": {"nested": true}}),
            json!({"id": "2", "tags": 12, "subtasks": false}),
            json!({"id": "3", "startDate": 5, "createdAt": "yesterday"}),
            json!({"id": 4, "estimatedHours": "lots", "status": 9}),
        ];
        for value in &weird {
            assert!(transform_value_to_ui(value).is_ok(), "failed on {}", value);
        }
    }

    #[test]
    fn test_batch_skips_bad_records() {
        let values = vec![
            json!({"id": "a", "title": "A"}),
            json!({"title": "no id"}),
            json!(null),
            json!({"id": "b", "title": "B"}),
        ];
        let tasks = normalize_task_values(&values);
        let ids: Vec<&str> = tasks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_encode_subtasks_roundtrip_shape() {
        let subtasks = vec![Subtask {
            id: SubtaskId::Text("c1".into()),
            title: "child".into(),
            completed: true,
        }];
        let encoded = encode_subtasks(&subtasks);
        assert_eq!(encoded, r#"[{"id":"c1","title":"child","completed":true}]"#);
        assert_eq!(parse_subtasks("t", &encoded), subtasks);
    }
}

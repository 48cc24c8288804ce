//! Task service: whole-record flows around the normalizer, the tree builder
//! and the parent validator

use super::hierarchy::{validate_parent_assignment, HierarchyError};
use super::models::{Subtask, TaskPriority, TaskRecord, TaskStatus, UiTask};
use super::normalize::{encode_subtasks, transform_task_to_ui};
use super::tree::{build_task_tree, find_node, TaskTreeNode};
use crate::store::{DecodeError, Record, RecordStore, StoreError, Table};
use crate::sync::patch::UPDATED_AT;
use crate::sync::FieldUpdateController;
use chrono::{NaiveDate, SecondsFormat, Utc};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Input refused before anything is sent to the store
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Title is required")]
    MissingTitle,

    #[error("Estimated hours must be a non-negative number, got {0}")]
    InvalidHours(f64),

    #[error("Progress must be between 0 and 100, got {0}")]
    InvalidProgress(i64),

    #[error("Invalid value for {field}: {reason}")]
    InvalidField { field: String, reason: String },

    #[error(transparent)]
    Hierarchy(#[from] HierarchyError),
}

#[derive(Debug, Error)]
pub enum TaskError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

impl From<HierarchyError> for TaskError {
    fn from(e: HierarchyError) -> Self {
        TaskError::Validation(e.into())
    }
}

/// Fields of a task to create
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub project: Option<String>,
    pub assignee: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub start_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub estimated_hours: Option<f64>,
    pub tags: Vec<String>,
    pub subtasks: Vec<Subtask>,
    pub progress: Option<i64>,
    pub parent_id: Option<String>,
}

impl NewTask {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }
}

/// Changes to apply to an existing task; `None` leaves a field as it is.
///
/// `parent_id: Some(None)` detaches the task to the top level.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TaskChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub project: Option<String>,
    pub assignee: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub start_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub estimated_hours: Option<f64>,
    pub tags: Option<Vec<String>>,
    pub comments: Option<String>,
    pub progress: Option<i64>,
    pub time_spent: Option<String>,
    #[serde(with = "double_option")]
    pub parent_id: Option<Option<String>>,
}

mod double_option {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<String>::deserialize(deserializer).map(Some)
    }
}

fn validate_title(title: &str) -> Result<(), ValidationError> {
    if title.trim().is_empty() {
        return Err(ValidationError::MissingTitle);
    }
    Ok(())
}

fn validate_hours(hours: f64) -> Result<(), ValidationError> {
    if !hours.is_finite() || hours < 0.0 {
        return Err(ValidationError::InvalidHours(hours));
    }
    Ok(())
}

fn validate_progress(progress: i64) -> Result<u8, ValidationError> {
    u8::try_from(progress)
        .ok()
        .filter(|p| *p <= 100)
        .ok_or(ValidationError::InvalidProgress(progress))
}

fn join_tags(tags: &[String]) -> Option<String> {
    let tags: Vec<&str> = tags
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .collect();
    (!tags.is_empty()).then(|| tags.join(","))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Manager for task operations
pub struct TaskManager {
    store: Arc<dyn RecordStore>,
    fields: Arc<FieldUpdateController>,
    /// Tasks as last seen in the store, kept in step with local writes
    known: RwLock<Vec<TaskRecord>>,
}

impl TaskManager {
    /// `fields` must be the controller for the task table
    pub fn new(store: Arc<dyn RecordStore>, fields: Arc<FieldUpdateController>) -> Self {
        Self {
            store,
            fields,
            known: RwLock::new(Vec::new()),
        }
    }

    /// The controller used for single-field edits
    pub fn field_controller(&self) -> &Arc<FieldUpdateController> {
        &self.fields
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Every task in the store. Records that cannot be decoded are skipped.
    pub async fn list_tasks(&self) -> Result<Vec<TaskRecord>, TaskError> {
        let records = self.store.list(Table::Tasks).await?;
        let tasks: Vec<TaskRecord> = records
            .iter()
            .filter_map(|record| match TaskRecord::from_record(record) {
                Ok(task) => Some(task),
                Err(e) => {
                    warn!("Skipping task record: {}", e);
                    None
                }
            })
            .collect();
        *self.known.write().await = tasks.clone();
        Ok(tasks)
    }

    /// Current task list, or the last known one when the store is unreachable
    async fn tasks_for_validation(&self) -> Result<Vec<TaskRecord>, TaskError> {
        match self.list_tasks().await {
            Ok(tasks) => Ok(tasks),
            Err(TaskError::Store(e)) => {
                let known = self.known.read().await.clone();
                warn!(
                    error = %e,
                    known = known.len(),
                    "Task list unavailable, validating against last known tasks"
                );
                Ok(known)
            }
            Err(e) => Err(e),
        }
    }

    async fn remember(&self, task: &TaskRecord) {
        let mut known = self.known.write().await;
        match known.iter_mut().find(|t| t.id == task.id) {
            Some(existing) => *existing = task.clone(),
            None => known.push(task.clone()),
        }
    }

    pub async fn list_ui_tasks(&self) -> Result<Vec<UiTask>, TaskError> {
        Ok(self
            .list_tasks()
            .await?
            .iter()
            .map(transform_task_to_ui)
            .collect())
    }

    /// Load every task and build the hierarchy
    pub async fn load_tree(&self) -> Result<Vec<TaskTreeNode<UiTask>>, TaskError> {
        let tasks = self.list_ui_tasks().await?;
        Ok(build_task_tree(&tasks))
    }

    pub async fn get_task(&self, id: &str) -> Result<TaskRecord, TaskError> {
        let record = self.store.get_by_id(Table::Tasks, id).await?;
        Ok(TaskRecord::from_record(&record)?)
    }

    // ========================================================================
    // Writes
    // ========================================================================

    /// Validate and create a task. The id and timestamps are generated here.
    pub async fn create_task(&self, new: NewTask) -> Result<TaskRecord, TaskError> {
        validate_title(&new.title)?;
        if let Some(hours) = new.estimated_hours {
            validate_hours(hours)?;
        }
        let progress = new.progress.map(validate_progress).transpose()?;

        let id = Uuid::new_v4().to_string();
        let parent_id = non_blank(new.parent_id);
        if let Some(parent) = parent_id.as_deref() {
            let tasks = self.list_tasks().await?;
            validate_parent_assignment(&id, Some(parent), &tasks)?;
            if !tasks.iter().any(|t| t.id == parent) {
                warn!(parent_id = parent, "Parent task not found, task will show at the top level");
            }
        }

        let now = Utc::now();
        let task = TaskRecord {
            id,
            title: Some(new.title.trim().to_string()),
            description: non_blank(new.description),
            project: non_blank(new.project),
            assignee: non_blank(new.assignee),
            status: new.status,
            priority: new.priority,
            start_date: new.start_date,
            due_date: new.due_date,
            estimated_hours: new.estimated_hours,
            tags: join_tags(&new.tags),
            subtasks: Some(encode_subtasks(&new.subtasks)),
            progress,
            parent_id,
            created_at: Some(now),
            updated_at: Some(now),
            ..Default::default()
        };

        let stored = self.store.create(Table::Tasks, task.to_record()).await?;
        let created = TaskRecord::from_record(&stored)?;
        self.remember(&created).await;
        info!(task_id = %created.id, parent_id = ?created.parent_id, "Created task");
        Ok(created)
    }

    /// Apply `changes` to the stored task and write the whole record back
    pub async fn update_task(&self, id: &str, changes: TaskChanges) -> Result<TaskRecord, TaskError> {
        if let Some(title) = &changes.title {
            validate_title(title)?;
        }
        if let Some(hours) = changes.estimated_hours {
            validate_hours(hours)?;
        }
        let progress = changes.progress.map(validate_progress).transpose()?;

        let mut task = self.get_task(id).await?;

        if let Some(parent) = changes.parent_id {
            let parent = non_blank(parent);
            if parent != task.parent_id {
                let tasks = self.list_tasks().await?;
                validate_parent_assignment(id, parent.as_deref(), &tasks)?;
            }
            task.parent_id = parent;
        }
        if let Some(title) = changes.title {
            task.title = Some(title.trim().to_string());
        }
        if let Some(description) = changes.description {
            task.description = Some(description);
        }
        if let Some(project) = changes.project {
            task.project = non_blank(Some(project));
        }
        if let Some(assignee) = changes.assignee {
            task.assignee = non_blank(Some(assignee));
        }
        if let Some(status) = changes.status {
            task.status = status;
        }
        if let Some(priority) = changes.priority {
            task.priority = priority;
        }
        if changes.start_date.is_some() {
            task.start_date = changes.start_date;
        }
        if changes.due_date.is_some() {
            task.due_date = changes.due_date;
        }
        if changes.estimated_hours.is_some() {
            task.estimated_hours = changes.estimated_hours;
        }
        if let Some(tags) = changes.tags {
            task.tags = join_tags(&tags);
        }
        if let Some(comments) = changes.comments {
            task.comments = Some(comments);
        }
        if progress.is_some() {
            task.progress = progress;
        }
        if let Some(time_spent) = changes.time_spent {
            task.time_spent = Some(time_spent);
        }
        task.updated_at = Some(Utc::now());

        let mut fields = task.to_record();
        fields.remove("id");
        fields.remove("createdAt");
        let stored = self.store.update(Table::Tasks, id, fields).await?;
        let updated = TaskRecord::from_record(&stored)?;
        self.remember(&updated).await;
        debug!(task_id = id, "Updated task");
        Ok(updated)
    }

    /// Delete a task. Children are left in place and become top-level tasks.
    pub async fn delete_task(&self, id: &str) -> Result<(), TaskError> {
        self.store.delete(Table::Tasks, id).await?;
        self.known.write().await.retain(|t| t.id != id);
        info!(task_id = id, "Deleted task");
        Ok(())
    }

    /// Re-parent a task (`None` moves it to the top level).
    ///
    /// The assignment is checked against the current task list, or the last
    /// known one while the store is unreachable, then sent as a field update.
    /// A store failure queues the move instead of failing it.
    pub async fn move_task(&self, id: &str, new_parent: Option<&str>) -> Result<bool, TaskError> {
        let new_parent = new_parent.map(str::trim).filter(|p| !p.is_empty());
        let tasks = self.tasks_for_validation().await?;
        validate_parent_assignment(id, new_parent, &tasks)?;

        let value = new_parent
            .map(|p| Value::String(p.to_string()))
            .unwrap_or(Value::Null);
        let moved = self.fields.update_field(id, "parentId", value).await;
        if moved {
            if let Some(task) = self.known.write().await.iter_mut().find(|t| t.id == id) {
                task.parent_id = new_parent.map(str::to_string);
            }
        }
        Ok(moved)
    }

    /// Set one field through the optimistic controller.
    ///
    /// Values for title, estimated hours, progress and parent are validated
    /// first; a parent change goes through [`move_task`](Self::move_task).
    pub async fn set_field(&self, id: &str, field: &str, value: Value) -> Result<bool, TaskError> {
        match field {
            "parentId" => {
                let parent = match &value {
                    Value::Null => None,
                    Value::String(s) => Some(s.as_str()),
                    other => {
                        return Err(ValidationError::InvalidField {
                            field: field.to_string(),
                            reason: format!("expected a task id, got {}", other),
                        }
                        .into())
                    }
                };
                return self.move_task(id, parent).await;
            }
            "title" => validate_title(value.as_str().unwrap_or_default())?,
            "estimatedHours" => {
                let hours = value.as_f64().ok_or_else(|| ValidationError::InvalidField {
                    field: field.to_string(),
                    reason: "expected a number".to_string(),
                })?;
                validate_hours(hours)?;
            }
            "progress" => {
                let progress = value.as_i64().ok_or_else(|| ValidationError::InvalidField {
                    field: field.to_string(),
                    reason: "expected a whole number".to_string(),
                })?;
                validate_progress(progress)?;
            }
            _ => {}
        }
        Ok(self.fields.update_field(id, field, value).await)
    }

    /// Regenerate the embedded subtask list of a task from its child tasks
    /// and write it to the store
    pub async fn refresh_subtask_cache(&self, id: &str) -> Result<Vec<Subtask>, TaskError> {
        let forest = self.load_tree().await?;
        let node = find_node(&forest, id).ok_or_else(|| StoreError::NotFound {
            table: Table::Tasks.name().to_string(),
            id: id.to_string(),
        })?;
        let subtasks = node.subtask_cache();

        let mut fields = Record::new();
        fields.insert("subtasks".into(), Value::String(encode_subtasks(&subtasks)));
        fields.insert(
            UPDATED_AT.into(),
            Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
        );
        self.store.update(Table::Tasks, id, fields).await?;
        debug!(task_id = id, count = subtasks.len(), "Refreshed subtask cache");
        Ok(subtasks)
    }
}

//! Task models: the stored record, the UI-ready task and their enums

use crate::store::decode::{self, DecodeError};
use crate::store::Record;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use tracing::warn;

/// Anything that sits in the task hierarchy
pub trait Hierarchical {
    fn id(&self) -> &str;
    fn parent_id(&self) -> Option<&str>;
}

/// Task workflow status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskStatus {
    #[default]
    #[serde(rename = "To Do")]
    ToDo,
    #[serde(rename = "In Progress")]
    InProgress,
    Review,
    Done,
    Blocked,
    #[serde(rename = "On Hold")]
    OnHold,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 6] = [
        TaskStatus::ToDo,
        TaskStatus::InProgress,
        TaskStatus::Review,
        TaskStatus::Done,
        TaskStatus::Blocked,
        TaskStatus::OnHold,
    ];

    /// Stored label
    pub fn label(self) -> &'static str {
        match self {
            TaskStatus::ToDo => "To Do",
            TaskStatus::InProgress => "In Progress",
            TaskStatus::Review => "Review",
            TaskStatus::Done => "Done",
            TaskStatus::Blocked => "Blocked",
            TaskStatus::OnHold => "On Hold",
        }
    }

    /// Parse a label, ignoring case, spaces, `-` and `_` ("in_progress" works)
    pub fn parse(s: &str) -> Option<Self> {
        let key = squash(s);
        Self::ALL.into_iter().find(|st| squash(st.label()) == key)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

/// Task priority
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl TaskPriority {
    pub const ALL: [TaskPriority; 4] = [
        TaskPriority::Low,
        TaskPriority::Medium,
        TaskPriority::High,
        TaskPriority::Critical,
    ];

    pub fn label(self) -> &'static str {
        match self {
            TaskPriority::Low => "Low",
            TaskPriority::Medium => "Medium",
            TaskPriority::High => "High",
            TaskPriority::Critical => "Critical",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let key = squash(s);
        Self::ALL.into_iter().find(|p| squash(p.label()) == key)
    }
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

fn squash(s: &str) -> String {
    s.chars()
        .filter(|c| !matches!(c, ' ' | '-' | '_'))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Id of an embedded subtask; older data uses numbers
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SubtaskId {
    Number(i64),
    Text(String),
}

impl fmt::Display for SubtaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubtaskId::Number(n) => write!(f, "{}", n),
            SubtaskId::Text(s) => f.write_str(s),
        }
    }
}

/// Entry of the embedded subtask list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subtask {
    pub id: SubtaskId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub completed: bool,
}

// ============================================================================
// Stored task record
// ============================================================================

/// A task as stored in the record store, after boundary decoding.
///
/// List-valued fields keep their stored encodings (`tags` comma-separated,
/// `subtasks` JSON text); turning them into lists is the normalizer's job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRecord {
    pub id: String,
    pub title: Option<String>,
    /// Legacy spelling of `title`
    pub name: Option<String>,
    pub description: Option<String>,
    /// Project id or name
    pub project: Option<String>,
    pub assignee: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub start_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub estimated_hours: Option<f64>,
    pub tags: Option<String>,
    pub subtasks: Option<String>,
    pub comments: Option<String>,
    pub progress: Option<u8>,
    pub parent_id: Option<String>,
    pub time_spent: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl TaskRecord {
    /// Create a bare record with just an id and title
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: Some(title.into()),
            ..Default::default()
        }
    }

    /// Set the parent reference
    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    /// Decode a stored record. Only a missing id is fatal; every other field
    /// falls back to "absent" when it cannot be read.
    pub fn from_record(record: &Record) -> Result<Self, DecodeError> {
        let id = decode::reference(record, "id").ok_or(DecodeError::MissingId { entity: "task" })?;

        let status = match decode::text(record, "status") {
            None => TaskStatus::default(),
            Some(raw) => TaskStatus::parse(&raw).unwrap_or_else(|| {
                warn!(task_id = %id, status = %raw, "Unknown task status, using To Do");
                TaskStatus::default()
            }),
        };
        let priority = match decode::text(record, "priority") {
            None => TaskPriority::default(),
            Some(raw) => TaskPriority::parse(&raw).unwrap_or_else(|| {
                warn!(task_id = %id, priority = %raw, "Unknown task priority, using Medium");
                TaskPriority::default()
            }),
        };

        Ok(Self {
            title: decode::text(record, "title"),
            name: decode::text(record, "name"),
            description: decode::text(record, "description"),
            project: decode::reference(record, "project"),
            assignee: decode::text(record, "assignee"),
            status,
            priority,
            start_date: decode::date(record, "startDate"),
            due_date: decode::date(record, "dueDate"),
            estimated_hours: decode::number(record, "estimatedHours").filter(|h| *h >= 0.0),
            tags: decode::comma_text(record, "tags"),
            subtasks: decode::json_text(record, "subtasks"),
            comments: decode::text(record, "comments"),
            progress: decode::percent(record, "progress"),
            parent_id: decode::reference(record, "parentId"),
            time_spent: decode::text(record, "timeSpent"),
            created_at: decode::timestamp(record, "createdAt"),
            updated_at: decode::timestamp(record, "updatedAt"),
            id,
        })
    }

    /// Decode a JSON value holding a stored record
    pub fn from_value(value: &Value) -> Result<Self, DecodeError> {
        Self::from_record(decode::as_record(value, "task")?)
    }

    /// Encode in the stored format. Absent optional fields are omitted;
    /// `parentId` is always written so detaching is explicit.
    pub fn to_record(&self) -> Record {
        let mut record = Record::new();
        record.insert("id".into(), Value::String(self.id.clone()));
        insert_opt(&mut record, "title", self.title.clone());
        insert_opt(&mut record, "name", self.name.clone());
        insert_opt(&mut record, "description", self.description.clone());
        insert_opt(&mut record, "project", self.project.clone());
        insert_opt(&mut record, "assignee", self.assignee.clone());
        record.insert("status".into(), Value::String(self.status.label().into()));
        record.insert("priority".into(), Value::String(self.priority.label().into()));
        insert_opt(&mut record, "startDate", self.start_date.map(format_date));
        insert_opt(&mut record, "dueDate", self.due_date.map(format_date));
        if let Some(hours) = self.estimated_hours {
            record.insert("estimatedHours".into(), serde_json::json!(hours));
        }
        insert_opt(&mut record, "tags", self.tags.clone());
        insert_opt(&mut record, "subtasks", self.subtasks.clone());
        insert_opt(&mut record, "comments", self.comments.clone());
        if let Some(progress) = self.progress {
            record.insert("progress".into(), Value::from(progress));
        }
        record.insert(
            "parentId".into(),
            self.parent_id.clone().map(Value::String).unwrap_or(Value::Null),
        );
        insert_opt(&mut record, "timeSpent", self.time_spent.clone());
        insert_opt(
            &mut record,
            "createdAt",
            self.created_at.map(|t| t.to_rfc3339()),
        );
        insert_opt(
            &mut record,
            "updatedAt",
            self.updated_at.map(|t| t.to_rfc3339()),
        );
        record
    }
}

fn insert_opt(record: &mut Record, key: &str, value: Option<String>) {
    if let Some(v) = value {
        record.insert(key.to_string(), Value::String(v));
    }
}

/// Stored date format
pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

impl Hierarchical for TaskRecord {
    fn id(&self) -> &str {
        &self.id
    }

    fn parent_id(&self) -> Option<&str> {
        self.parent_id.as_deref()
    }
}

// ============================================================================
// UI task
// ============================================================================

/// A task with every default filled in, ready for list, tree and grid views
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiTask {
    pub id: String,
    pub title: String,
    pub description: String,
    pub project: String,
    pub assignee: String,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub start_date: NaiveDate,
    pub due_date: NaiveDate,
    pub estimated_hours: f64,
    /// `"{estimatedHours}h"`
    pub estimated_time: String,
    pub time_spent: String,
    pub tags: Vec<String>,
    pub subtasks: Vec<Subtask>,
    pub comments: String,
    pub progress: u8,
    pub parent_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Hierarchical for UiTask {
    fn id(&self) -> &str {
        &self.id
    }

    fn parent_id(&self) -> Option<&str> {
        self.parent_id.as_deref()
    }
}

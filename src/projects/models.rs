//! Project models and DTOs

use crate::store::decode::{self, DecodeError};
use crate::store::Record;
use crate::tasks::models::{format_date, UiTask};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A project as stored, after boundary decoding.
///
/// `tasks` is the authoritative membership list. In the store it is a
/// JSON-encoded array of task ids, `tags` likewise, and `team` is a
/// comma-joined list of names.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectRecord {
    pub id: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub company: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub budget: Option<f64>,
    pub team: Vec<String>,
    pub tasks: Vec<String>,
    pub tags: Vec<String>,
    pub progress: Option<u8>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl ProjectRecord {
    pub fn from_record(record: &Record) -> Result<Self, DecodeError> {
        let id = decode::reference(record, "id").ok_or(DecodeError::MissingId { entity: "project" })?;
        Ok(Self {
            id,
            name: decode::text(record, "name"),
            description: decode::text(record, "description"),
            company: decode::reference(record, "company"),
            status: decode::text(record, "status"),
            priority: decode::text(record, "priority"),
            start_date: decode::date(record, "startDate"),
            end_date: decode::date(record, "endDate"),
            budget: decode::number(record, "budget"),
            team: decode::string_list(record, "team"),
            tasks: decode::string_list(record, "tasks"),
            tags: decode::string_list(record, "tags"),
            progress: decode::percent(record, "progress"),
            created_at: decode::timestamp(record, "createdAt"),
            updated_at: decode::timestamp(record, "updatedAt"),
        })
    }

    pub fn from_value(value: &Value) -> Result<Self, DecodeError> {
        Self::from_record(decode::as_record(value, "project")?)
    }

    /// Display name, falling back to the id
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }

    /// Encode in the stored format
    pub fn to_record(&self) -> Record {
        let mut record = Record::new();
        record.insert("id".into(), Value::String(self.id.clone()));
        let text_fields = [
            ("name", &self.name),
            ("description", &self.description),
            ("company", &self.company),
            ("status", &self.status),
            ("priority", &self.priority),
        ];
        for (key, value) in text_fields {
            if let Some(v) = value {
                record.insert(key.into(), Value::String(v.clone()));
            }
        }
        if let Some(date) = self.start_date {
            record.insert("startDate".into(), Value::String(format_date(date)));
        }
        if let Some(date) = self.end_date {
            record.insert("endDate".into(), Value::String(format_date(date)));
        }
        if let Some(budget) = self.budget {
            record.insert("budget".into(), serde_json::json!(budget));
        }
        record.insert("team".into(), Value::String(self.team.join(",")));
        record.insert("tasks".into(), encode_ids(&self.tasks));
        record.insert("tags".into(), encode_ids(&self.tags));
        if let Some(progress) = self.progress {
            record.insert("progress".into(), Value::from(progress));
        }
        if let Some(t) = self.created_at {
            record.insert("createdAt".into(), Value::String(t.to_rfc3339()));
        }
        if let Some(t) = self.updated_at {
            record.insert("updatedAt".into(), Value::String(t.to_rfc3339()));
        }
        record
    }

    /// Whether a task belongs to this project, either through the membership
    /// list or through its own `project` field (id or name)
    pub fn owns(&self, task: &UiTask) -> bool {
        if self.tasks.iter().any(|id| *id == task.id) {
            return true;
        }
        let project = task.project.trim();
        !project.is_empty()
            && (project == self.id || self.name.as_deref().map(str::trim) == Some(project))
    }
}

/// JSON-encoded string array, the stored form of `tasks` and `tags`
pub fn encode_ids(ids: &[String]) -> Value {
    Value::String(Value::from(ids.to_vec()).to_string())
}

/// Tasks belonging to `project`, in input order
pub fn project_tasks<'a>(project: &ProjectRecord, tasks: &'a [UiTask]) -> Vec<&'a UiTask> {
    tasks.iter().filter(|task| project.owns(task)).collect()
}

/// Request to create a project
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewProject {
    pub name: String,
    pub description: Option<String>,
    pub company: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub budget: Option<f64>,
    pub team: Vec<String>,
    pub tags: Vec<String>,
}

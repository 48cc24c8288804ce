//! Project management operations

use super::models::{encode_ids, project_tasks, NewProject, ProjectRecord};
use crate::store::{DecodeError, Record, RecordStore, StoreError, Table};
use crate::sync::patch::UPDATED_AT;
use crate::sync::FieldUpdateController;
use crate::tasks::models::UiTask;
use chrono::{SecondsFormat, Utc};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("Project name is required")]
    MissingName,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// Manager for project operations
pub struct ProjectManager {
    store: Arc<dyn RecordStore>,
    fields: Arc<FieldUpdateController>,
}

impl ProjectManager {
    /// `fields` must be the controller for the project table
    pub fn new(store: Arc<dyn RecordStore>, fields: Arc<FieldUpdateController>) -> Self {
        Self { store, fields }
    }

    pub fn field_controller(&self) -> &Arc<FieldUpdateController> {
        &self.fields
    }

    pub async fn list_projects(&self) -> Result<Vec<ProjectRecord>, ProjectError> {
        let records = self.store.list(Table::Projects).await?;
        Ok(records
            .iter()
            .filter_map(|record| match ProjectRecord::from_record(record) {
                Ok(project) => Some(project),
                Err(e) => {
                    warn!("Skipping project record: {}", e);
                    None
                }
            })
            .collect())
    }

    pub async fn get_project(&self, id: &str) -> Result<ProjectRecord, ProjectError> {
        let record = self.store.get_by_id(Table::Projects, id).await?;
        Ok(ProjectRecord::from_record(&record)?)
    }

    /// Create a project with an empty membership list
    pub async fn create_project(&self, new: NewProject) -> Result<ProjectRecord, ProjectError> {
        let name = new.name.trim();
        if name.is_empty() {
            return Err(ProjectError::MissingName);
        }

        let now = Utc::now();
        let project = ProjectRecord {
            id: Uuid::new_v4().to_string(),
            name: Some(name.to_string()),
            description: new.description,
            company: new.company,
            status: new.status,
            priority: new.priority,
            start_date: new.start_date,
            end_date: new.end_date,
            budget: new.budget,
            team: new.team,
            tasks: Vec::new(),
            tags: new.tags,
            progress: Some(0),
            created_at: Some(now),
            updated_at: Some(now),
        };

        let stored = self.store.create(Table::Projects, project.to_record()).await?;
        let created = ProjectRecord::from_record(&stored)?;
        info!(project_id = %created.id, name = %created.display_name(), "Created project");
        Ok(created)
    }

    /// Set one project field through the optimistic controller
    pub async fn set_field(&self, id: &str, field: &str, value: Value) -> bool {
        self.fields.update_field(id, field, value).await
    }

    /// Add a task id to the membership list. Adding a member twice is a no-op.
    pub async fn add_task_to_project(
        &self,
        project_id: &str,
        task_id: &str,
    ) -> Result<ProjectRecord, ProjectError> {
        let project = self.get_project(project_id).await?;
        if project.tasks.iter().any(|id| id == task_id) {
            debug!(project_id, task_id, "Task already in project");
            return Ok(project);
        }
        let mut tasks = project.tasks;
        tasks.push(task_id.to_string());
        self.write_membership(project_id, &tasks).await
    }

    /// Remove a task id from the membership list
    pub async fn remove_task_from_project(
        &self,
        project_id: &str,
        task_id: &str,
    ) -> Result<ProjectRecord, ProjectError> {
        let project = self.get_project(project_id).await?;
        if !project.tasks.iter().any(|id| id == task_id) {
            debug!(project_id, task_id, "Task not in project");
            return Ok(project);
        }
        let tasks: Vec<String> = project
            .tasks
            .into_iter()
            .filter(|id| id != task_id)
            .collect();
        self.write_membership(project_id, &tasks).await
    }

    async fn write_membership(
        &self,
        project_id: &str,
        tasks: &[String],
    ) -> Result<ProjectRecord, ProjectError> {
        let mut fields = Record::new();
        fields.insert("tasks".into(), encode_ids(tasks));
        fields.insert(
            UPDATED_AT.into(),
            Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
        );
        let stored = self.store.update(Table::Projects, project_id, fields).await?;
        debug!(project_id, members = tasks.len(), "Updated project membership");
        Ok(ProjectRecord::from_record(&stored)?)
    }

    /// Tasks of a project, from the membership list and the tasks' own
    /// `project` field
    pub async fn project_tasks(
        &self,
        project_id: &str,
        tasks: &[UiTask],
    ) -> Result<Vec<UiTask>, ProjectError> {
        let project = self.get_project(project_id).await?;
        Ok(project_tasks(&project, tasks).into_iter().cloned().collect())
    }

    /// Delete a project. Member tasks are not touched.
    pub async fn delete_project(&self, id: &str) -> Result<(), ProjectError> {
        self.store.delete(Table::Projects, id).await?;
        info!(project_id = id, "Deleted project");
        Ok(())
    }
}

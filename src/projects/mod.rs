//! Projects and task membership

pub mod manager;
pub mod models;

pub use manager::{ProjectError, ProjectManager};
pub use models::{project_tasks, NewProject, ProjectRecord};

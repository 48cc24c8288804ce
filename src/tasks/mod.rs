//! Tasks: stored model, UI normalization, hierarchy and the task service

pub mod hierarchy;
pub mod manager;
pub mod models;
pub mod normalize;
pub mod tree;

pub use hierarchy::{validate_parent_assignment, HierarchyError, ParentValidation};
pub use manager::{NewTask, TaskChanges, TaskError, TaskManager, ValidationError};
pub use models::{Hierarchical, Subtask, SubtaskId, TaskPriority, TaskRecord, TaskStatus, UiTask};
pub use normalize::{normalize_task_values, transform_task_to_ui};
pub use tree::{build_task_tree, flatten_all, flatten_tree, FlatRow, TaskTreeNode};

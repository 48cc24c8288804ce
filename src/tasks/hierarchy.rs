//! Parent assignment validation
//!
//! Checked against the caller's current view of the task list before any
//! write that changes `parentId`. The view may be stale; the store itself
//! does not enforce the hierarchy.

use super::models::Hierarchical;
use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;

/// Why a parent assignment was refused
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HierarchyError {
    #[error("A task cannot be its own parent.")]
    SelfParent,

    #[error("Cannot create circular dependency")]
    CircularDependency,
}

/// Validate making `proposed_parent_id` the parent of `task_id`.
///
/// `None` (detach to root) is always valid. Otherwise the proposed parent must
/// not be the task itself or one of its descendants. The ancestor walk stops
/// after `all_tasks.len()` steps, so cycles already present in stored data
/// cannot hang it.
pub fn validate_parent_assignment<T: Hierarchical>(
    task_id: &str,
    proposed_parent_id: Option<&str>,
    all_tasks: &[T],
) -> Result<(), HierarchyError> {
    let Some(proposed) = proposed_parent_id else {
        return Ok(());
    };
    if proposed == task_id {
        return Err(HierarchyError::SelfParent);
    }

    let mut parent_of: HashMap<&str, Option<&str>> = HashMap::with_capacity(all_tasks.len());
    for task in all_tasks {
        parent_of.entry(task.id()).or_insert(task.parent_id());
    }

    let mut current = Some(proposed);
    for _ in 0..all_tasks.len() {
        let Some(id) = current else {
            break;
        };
        if id == task_id {
            return Err(HierarchyError::CircularDependency);
        }
        current = parent_of.get(id).copied().flatten();
    }

    Ok(())
}

/// Result of a parent check in `{isValid, error}` form, for callers that
/// report validation state rather than branch on it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParentValidation {
    pub is_valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<Result<(), HierarchyError>> for ParentValidation {
    fn from(result: Result<(), HierarchyError>) -> Self {
        match result {
            Ok(()) => Self {
                is_valid: true,
                error: None,
            },
            Err(e) => Self {
                is_valid: false,
                error: Some(e.to_string()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::models::TaskRecord;

    fn task(id: &str, parent: Option<&str>) -> TaskRecord {
        let t = TaskRecord::new(id, id);
        match parent {
            Some(p) => t.with_parent(p),
            None => t,
        }
    }

    fn chain() -> Vec<TaskRecord> {
        // C's parent is B, B's parent is A; D is unrelated
        vec![
            task("A", None),
            task("B", Some("A")),
            task("C", Some("B")),
            task("D", None),
        ]
    }

    #[test]
    fn test_detach_is_valid() {
        assert_eq!(validate_parent_assignment("C", None, &chain()), Ok(()));
    }

    #[test]
    fn test_self_parent_is_invalid_regardless_of_tasks() {
        assert_eq!(
            validate_parent_assignment::<TaskRecord>("A", Some("A"), &[]),
            Err(HierarchyError::SelfParent)
        );
        assert_eq!(
            validate_parent_assignment("A", Some("A"), &chain()),
            Err(HierarchyError::SelfParent)
        );
    }

    #[test]
    fn test_descendant_as_parent_is_circular() {
        let tasks = chain();
        assert_eq!(
            validate_parent_assignment("A", Some("C"), &tasks),
            Err(HierarchyError::CircularDependency)
        );
        assert_eq!(
            validate_parent_assignment("B", Some("C"), &tasks),
            Err(HierarchyError::CircularDependency)
        );
    }

    #[test]
    fn test_unrelated_parent_is_valid() {
        let tasks = chain();
        assert_eq!(validate_parent_assignment("A", Some("D"), &tasks), Ok(()));
        // Moving a child under its sibling's descendant, or an ancestor, is fine
        assert_eq!(validate_parent_assignment("C", Some("A"), &tasks), Ok(()));
        assert_eq!(validate_parent_assignment("D", Some("C"), &tasks), Ok(()));
    }

    #[test]
    fn test_unknown_parent_is_valid() {
        assert_eq!(validate_parent_assignment("A", Some("ghost"), &chain()), Ok(()));
    }

    #[test]
    fn test_corrupt_cycle_terminates() {
        let tasks = vec![task("X", Some("Y")), task("Y", Some("X")), task("Z", None)];
        assert_eq!(validate_parent_assignment("Z", Some("X"), &tasks), Ok(()));
        assert_eq!(
            validate_parent_assignment("X", Some("Y"), &tasks),
            Err(HierarchyError::CircularDependency)
        );
    }

    #[test]
    fn test_validation_view_messages() {
        let tasks = chain();
        let view: ParentValidation = validate_parent_assignment("A", Some("A"), &tasks).into();
        assert!(!view.is_valid);
        assert_eq!(view.error.as_deref(), Some("A task cannot be its own parent."));

        let view: ParentValidation = validate_parent_assignment("A", Some("C"), &tasks).into();
        assert_eq!(view.error.as_deref(), Some("Cannot create circular dependency"));

        let view: ParentValidation = validate_parent_assignment("A", Some("D"), &tasks).into();
        assert!(view.is_valid);
        assert_eq!(serde_json::to_value(&view).unwrap(), serde_json::json!({"isValid": true}));
    }
}

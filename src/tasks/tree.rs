//! Task hierarchy: flat records -> forest, and forest -> display rows
//!
//! `parentId` is the only relationship. A task whose parent cannot be found in
//! the input (deleted parent, self-reference, or a cycle already present in
//! stored data) is placed at the top level, so every input task appears in the
//! forest exactly once.

use super::models::{Hierarchical, Subtask, SubtaskId, TaskStatus, UiTask};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::warn;

/// A task with its resolved children and its depth (roots are level 0)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskTreeNode<T> {
    pub task: T,
    pub children: Vec<TaskTreeNode<T>>,
    pub level: usize,
}

impl<T: Hierarchical> TaskTreeNode<T> {
    pub fn id(&self) -> &str {
        self.task.id()
    }

    /// Number of nodes in this subtree, this node included
    pub fn size(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            count += 1;
            stack.extend(node.children.iter());
        }
        count
    }

    /// Find a node by id in this subtree, depth-first
    pub fn find(&self, id: &str) -> Option<&TaskTreeNode<T>> {
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            if node.id() == id {
                return Some(node);
            }
            stack.extend(node.children.iter().rev());
        }
        None
    }

    /// Ids of every descendant, depth-first
    pub fn descendant_ids(&self) -> Vec<&str> {
        let mut ids = Vec::new();
        let mut stack: Vec<&TaskTreeNode<T>> = self.children.iter().rev().collect();
        while let Some(node) = stack.pop() {
            ids.push(node.id());
            stack.extend(node.children.iter().rev());
        }
        ids
    }
}

// Unlinks children one level at a time so deep chains drop without recursion
impl<T> Drop for TaskTreeNode<T> {
    fn drop(&mut self) {
        let mut stack = std::mem::take(&mut self.children);
        while let Some(mut node) = stack.pop() {
            stack.append(&mut node.children);
        }
    }
}

impl TaskTreeNode<UiTask> {
    /// Regenerate the embedded subtask list from this node's children.
    ///
    /// The child records are authoritative; a child counts as completed when
    /// its status is Done.
    pub fn subtask_cache(&self) -> Vec<Subtask> {
        self.children
            .iter()
            .map(|child| Subtask {
                id: SubtaskId::Text(child.task.id.clone()),
                title: child.task.title.clone(),
                completed: child.task.status == TaskStatus::Done,
            })
            .collect()
    }
}

/// Build the forest for a flat task list.
///
/// Roots and children keep input order. Duplicate ids resolve to their first
/// occurrence. Built without recursion, so stored chains of any depth are
/// safe.
pub fn build_task_tree<T: Hierarchical + Clone>(tasks: &[T]) -> Vec<TaskTreeNode<T>> {
    let parents = resolve_parents(tasks);

    let mut children: Vec<Vec<usize>> = vec![Vec::new(); tasks.len()];
    let mut roots = Vec::new();
    for (index, parent) in parents.iter().enumerate() {
        match parent {
            Some(p) => children[*p].push(index),
            None => roots.push(index),
        }
    }

    // Pre-order walk assigning levels; parents come before their children
    let mut levels = vec![0usize; tasks.len()];
    let mut order = Vec::with_capacity(tasks.len());
    let mut stack: Vec<usize> = roots.iter().rev().copied().collect();
    while let Some(index) = stack.pop() {
        order.push(index);
        for &child in children[index].iter().rev() {
            levels[child] = levels[index] + 1;
            stack.push(child);
        }
    }

    // Build bottom-up: every child is finished before its parent
    let mut built: Vec<Option<TaskTreeNode<T>>> = (0..tasks.len()).map(|_| None).collect();
    for &index in order.iter().rev() {
        let node_children = children[index]
            .iter()
            .filter_map(|&child| built[child].take())
            .collect();
        built[index] = Some(TaskTreeNode {
            task: tasks[index].clone(),
            children: node_children,
            level: levels[index],
        });
    }

    roots
        .into_iter()
        .filter_map(|root| built[root].take())
        .collect()
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Visit {
    Unvisited,
    OnPath,
    Done,
}

/// Index of each task's effective parent, `None` for roots.
///
/// Self-references and unknown parents become roots. Each cycle is cut at its
/// member that comes first in input order. Every task is visited once.
fn resolve_parents<T: Hierarchical>(tasks: &[T]) -> Vec<Option<usize>> {
    let mut index_of: HashMap<&str, usize> = HashMap::with_capacity(tasks.len());
    for (index, task) in tasks.iter().enumerate() {
        index_of.entry(task.id()).or_insert(index);
    }

    let mut parents: Vec<Option<usize>> = tasks
        .iter()
        .enumerate()
        .map(|(index, task)| {
            let parent = index_of.get(task.parent_id()?).copied()?;
            if parent == index || task.parent_id() == Some(task.id()) {
                warn!(task_id = task.id(), "Task references itself as parent, treating as root");
                return None;
            }
            Some(parent)
        })
        .collect();

    let mut state = vec![Visit::Unvisited; tasks.len()];
    let mut path: Vec<usize> = Vec::new();
    for start in 0..tasks.len() {
        if state[start] != Visit::Unvisited {
            continue;
        }
        path.clear();
        let mut current = Some(start);
        while let Some(index) = current {
            match state[index] {
                Visit::Done => break,
                Visit::OnPath => {
                    // `index` closes a cycle made of the path from `index` onwards
                    let from = path.iter().position(|&i| i == index).unwrap_or(0);
                    if let Some(&first) = path[from..].iter().min() {
                        warn!(
                            task_id = tasks[first].id(),
                            "Task is part of a parent cycle, treating as root"
                        );
                        parents[first] = None;
                    }
                    break;
                }
                Visit::Unvisited => {
                    state[index] = Visit::OnPath;
                    path.push(index);
                    current = parents[index];
                }
            }
        }
        for &index in &path {
            state[index] = Visit::Done;
        }
    }

    parents
}

/// Total number of nodes in a forest
pub fn count_nodes<T: Hierarchical>(forest: &[TaskTreeNode<T>]) -> usize {
    forest.iter().map(TaskTreeNode::size).sum()
}

/// Find a node by id anywhere in a forest
pub fn find_node<'a, T: Hierarchical>(
    forest: &'a [TaskTreeNode<T>],
    id: &str,
) -> Option<&'a TaskTreeNode<T>> {
    forest.iter().find_map(|root| root.find(id))
}

/// One display row of a flattened forest
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlatRow<'a, T> {
    pub task: &'a T,
    pub level: usize,
    pub has_children: bool,
    pub expanded: bool,
}

/// Flatten a forest depth-first. A node's children are emitted right after it,
/// but only when its id is in `expanded`.
pub fn flatten_tree<'a, T: Hierarchical>(
    forest: &'a [TaskTreeNode<T>],
    expanded: &HashSet<String>,
) -> Vec<FlatRow<'a, T>> {
    let mut rows = Vec::new();
    for root in forest {
        push_rows(root, &|id: &str| expanded.contains(id), &mut rows);
    }
    rows
}

/// Flatten a forest with every node expanded
pub fn flatten_all<T: Hierarchical>(forest: &[TaskTreeNode<T>]) -> Vec<FlatRow<'_, T>> {
    let mut rows = Vec::new();
    for root in forest {
        push_rows(root, &|_: &str| true, &mut rows);
    }
    rows
}

fn push_rows<'a, T: Hierarchical>(
    root: &'a TaskTreeNode<T>,
    is_expanded: &dyn Fn(&str) -> bool,
    rows: &mut Vec<FlatRow<'a, T>>,
) {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        let expanded = is_expanded(node.id());
        rows.push(FlatRow {
            task: &node.task,
            level: node.level,
            has_children: !node.children.is_empty(),
            expanded,
        });
        if expanded {
            stack.extend(node.children.iter().rev());
        }
    }
}

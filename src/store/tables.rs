//! Table names for the record store

use serde::{Deserialize, Serialize};
use std::fmt;

/// Tables served by the record store.
///
/// Each table also owns a separate pending-update list so queued edits for
/// tasks never mix with queued edits for projects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Tasks,
    Projects,
    Teams,
    Companies,
}

impl Table {
    /// Every table, in a fixed order
    pub const ALL: [Table; 4] = [Table::Tasks, Table::Projects, Table::Teams, Table::Companies];

    /// Name of the table on the record store
    pub fn name(self) -> &'static str {
        match self {
            Table::Tasks => table_names::TASKS,
            Table::Projects => table_names::PROJECTS,
            Table::Teams => table_names::TEAMS,
            Table::Companies => table_names::COMPANIES,
        }
    }

    /// Storage key of the pending-update list for this table
    pub fn pending_key(self) -> &'static str {
        match self {
            Table::Tasks => "pendingTaskUpdates",
            Table::Projects => "pendingProjectUpdates",
            Table::Teams => "pendingTeamUpdates",
            Table::Companies => "pendingCompanyUpdates",
        }
    }

    /// Singular label used in log lines and user-facing messages
    pub fn entity_label(self) -> &'static str {
        match self {
            Table::Tasks => "task",
            Table::Projects => "project",
            Table::Teams => "team",
            Table::Companies => "company",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Table names
pub mod table_names {
    pub const TASKS: &str = "project-management-tasks";
    pub const PROJECTS: &str = "project-management-projects";
    pub const TEAMS: &str = "project-management-teams";
    pub const COMPANIES: &str = "project-management-companies";
}

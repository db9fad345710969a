//! Task data structures and related functionality.
//!
//! This module defines the core `TaskNode` struct that represents a single
//! work item in a project's task tree, along with its time-tracking records
//! and assignee references.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A user reference attached to a task assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignee {
    pub id: String,
    pub name: String,
    pub email: String,
}

/// A cumulative time-tracking record for one user on one task.
///
/// Timer stops and manual additions both fold into the same entry's
/// `duration`, so a user has at most one entry per task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeEntry {
    pub id: String,
    pub user_id: String,
    pub user_name: String,
    pub start_time: DateTime<Utc>,
    /// Accumulated minutes, fractional.
    pub duration: f64,
}

/// A work item within a project's hierarchical task tree.
///
/// Tasks form a forest per project: `parent_id == None` marks a root task.
/// Children are not embedded here; the [`TaskTree`](crate::tree::TaskTree)
/// arena derives them from `parent_id`, which keeps a node's stored children
/// and its actual children from ever drifting apart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskNode {
    pub id: String,
    pub project_id: String,
    pub parent_id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Share of the parent's completion (or of the project, for roots), 0-100.
    pub percentage: u32,
    pub hours: Option<f64>,
    pub cost_per_hour: Option<f64>,
    pub assigned_to: Vec<Assignee>,
    pub deadline: DateTime<Utc>,
    /// Leaf-completion flag. Meaningful for tasks without children; a
    /// non-leaf's effective completion is derived from its children.
    pub completed: bool,
    #[serde(default)]
    pub outsource_team_id: Option<String>,
    #[serde(default)]
    pub time_entries: Vec<TimeEntry>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TaskNode {
    /// True when this task is a root-level task of its project.
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Total minutes recorded against this task across all users.
    pub fn recorded_minutes(&self) -> f64 {
        self.time_entries.iter().map(|e| e.duration).sum()
    }

    /// The cumulative time entry for a given user, if any.
    pub fn entry_for_user(&self, user_id: &str) -> Option<&TimeEntry> {
        self.time_entries.iter().find(|e| e.user_id == user_id)
    }
}

/// A nested, display-oriented view of a task and its subtree.
///
/// Built on demand from the arena; never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct TaskView {
    pub task: TaskNode,
    pub children: Vec<TaskView>,
}

//! Task aggregate and status enum.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::{ProjectId, TaskId, TeamId, UserId};

/// Lifecycle status of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Done,
    Archived,
}

impl TaskStatus {
    /// Whether the task has reached a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Done | TaskStatus::Archived)
    }
}

/// The task aggregate cached and served by the read paths.
///
/// Lifecycle rules (assignment, transitions, permissions) are owned by the
/// surrounding service layer; this type only carries the data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub task_id: TaskId,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status: TaskStatus,
    pub owner_id: UserId,
    pub team_id: TeamId,
    pub project_id: ProjectId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Create a new task in `Todo` state with fresh timestamps.
    pub fn new(
        title: impl Into<String>,
        owner_id: UserId,
        team_id: TeamId,
        project_id: ProjectId,
    ) -> Self {
        let now = Utc::now();
        Self {
            task_id: TaskId::generate(),
            title: title.into(),
            description: None,
            status: TaskStatus::Todo,
            owner_id,
            team_id,
            project_id,
            due_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_task_defaults() {
        let task = Task::new(
            "Write launch notes",
            UserId::generate(),
            TeamId::generate(),
            ProjectId::generate(),
        );
        assert_eq!(task.status, TaskStatus::Todo);
        assert!(task.description.is_none());
        assert_eq!(task.created_at, task.updated_at);
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!TaskStatus::Todo.is_terminal());
        assert!(!TaskStatus::InProgress.is_terminal());
        assert!(TaskStatus::Done.is_terminal());
        assert!(TaskStatus::Archived.is_terminal());
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&TaskStatus::InProgress).expect("serialize");
        assert_eq!(json, "\"in_progress\"");
    }
}

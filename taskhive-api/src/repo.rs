//! Task repository seam.
//!
//! The source of truth the cache layer degrades to. Real persistence is an
//! external collaborator; this module defines the trait the routes consume
//! plus an in-memory implementation for tests and single-node use.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use taskhive_core::{ProjectId, Task, TaskId, TaskStatus, TeamId, UserId};

/// Repository failure modes.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RepoError {
    #[error("task not found: {0}")]
    NotFound(TaskId),

    #[error("repository unavailable: {reason}")]
    Unavailable { reason: String },
}

/// Partial update applied to an existing task.
#[derive(Debug, Clone, Default)]
pub struct TaskUpdate {
    /// New title
    pub title: Option<String>,
    /// New description
    pub description: Option<String>,
    /// New status
    pub status: Option<TaskStatus>,
    /// New due date
    pub due_at: Option<DateTime<Utc>>,
}

/// Source-of-truth store for task aggregates.
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Fetch a task by id.
    async fn fetch_task(&self, id: TaskId) -> Result<Option<Task>, RepoError>;

    /// Fetch every task owned by `user_id`.
    async fn fetch_user_tasks(&self, user_id: UserId) -> Result<Vec<Task>, RepoError>;

    /// Fetch every task belonging to `team_id`.
    async fn fetch_team_tasks(&self, team_id: TeamId) -> Result<Vec<Task>, RepoError>;

    /// Fetch every task in `project_id`.
    async fn fetch_project_tasks(&self, project_id: ProjectId) -> Result<Vec<Task>, RepoError>;

    /// Persist a new task.
    async fn insert_task(&self, task: Task) -> Result<Task, RepoError>;

    /// Apply a partial update, returning the stored result.
    async fn update_task(&self, id: TaskId, update: TaskUpdate) -> Result<Task, RepoError>;
}

/// RwLock-map repository for tests and single-node deployments.
#[derive(Default)]
pub struct InMemoryTaskRepository {
    tasks: RwLock<HashMap<TaskId, Task>>,
}

impl InMemoryTaskRepository {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_err() -> RepoError {
        RepoError::Unavailable {
            reason: "repository lock poisoned".to_string(),
        }
    }
}

#[async_trait]
impl TaskRepository for InMemoryTaskRepository {
    async fn fetch_task(&self, id: TaskId) -> Result<Option<Task>, RepoError> {
        let tasks = self.tasks.read().map_err(|_| Self::lock_err())?;
        Ok(tasks.get(&id).cloned())
    }

    async fn fetch_user_tasks(&self, user_id: UserId) -> Result<Vec<Task>, RepoError> {
        let tasks = self.tasks.read().map_err(|_| Self::lock_err())?;
        let mut owned: Vec<Task> = tasks
            .values()
            .filter(|task| task.owner_id == user_id)
            .cloned()
            .collect();
        owned.sort_by_key(|task| task.task_id);
        Ok(owned)
    }

    async fn fetch_team_tasks(&self, team_id: TeamId) -> Result<Vec<Task>, RepoError> {
        let tasks = self.tasks.read().map_err(|_| Self::lock_err())?;
        let mut owned: Vec<Task> = tasks
            .values()
            .filter(|task| task.team_id == team_id)
            .cloned()
            .collect();
        owned.sort_by_key(|task| task.task_id);
        Ok(owned)
    }

    async fn fetch_project_tasks(&self, project_id: ProjectId) -> Result<Vec<Task>, RepoError> {
        let tasks = self.tasks.read().map_err(|_| Self::lock_err())?;
        let mut owned: Vec<Task> = tasks
            .values()
            .filter(|task| task.project_id == project_id)
            .cloned()
            .collect();
        owned.sort_by_key(|task| task.task_id);
        Ok(owned)
    }

    async fn insert_task(&self, task: Task) -> Result<Task, RepoError> {
        let mut tasks = self.tasks.write().map_err(|_| Self::lock_err())?;
        tasks.insert(task.task_id, task.clone());
        Ok(task)
    }

    async fn update_task(&self, id: TaskId, update: TaskUpdate) -> Result<Task, RepoError> {
        let mut tasks = self.tasks.write().map_err(|_| Self::lock_err())?;
        let task = tasks.get_mut(&id).ok_or(RepoError::NotFound(id))?;

        if let Some(title) = update.title {
            task.title = title;
        }
        if let Some(description) = update.description {
            task.description = Some(description);
        }
        if let Some(status) = update.status {
            task.status = status;
        }
        if let Some(due_at) = update.due_at {
            task.due_at = Some(due_at);
        }
        task.updated_at = Utc::now();

        Ok(task.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_task(owner: UserId, team: TeamId, project: ProjectId) -> Task {
        Task::new("Triage inbox", owner, team, project)
    }

    #[tokio::test]
    async fn test_insert_and_fetch() {
        let repo = InMemoryTaskRepository::new();
        let task = make_task(UserId::generate(), TeamId::generate(), ProjectId::generate());

        repo.insert_task(task.clone())
            .await
            .expect("insert should succeed");
        let fetched = repo
            .fetch_task(task.task_id)
            .await
            .expect("fetch should succeed");
        assert_eq!(fetched, Some(task));
    }

    #[tokio::test]
    async fn test_list_views_filter_correctly() {
        let repo = InMemoryTaskRepository::new();
        let owner = UserId::generate();
        let team = TeamId::generate();
        let project = ProjectId::generate();

        let mine = make_task(owner, team, project);
        let theirs = make_task(UserId::generate(), team, ProjectId::generate());
        repo.insert_task(mine.clone()).await.expect("insert should succeed");
        repo.insert_task(theirs.clone()).await.expect("insert should succeed");

        let user_tasks = repo.fetch_user_tasks(owner).await.expect("fetch should succeed");
        assert_eq!(user_tasks, vec![mine.clone()]);

        let team_tasks = repo.fetch_team_tasks(team).await.expect("fetch should succeed");
        assert_eq!(team_tasks.len(), 2);

        let project_tasks = repo
            .fetch_project_tasks(project)
            .await
            .expect("fetch should succeed");
        assert_eq!(project_tasks, vec![mine]);
    }

    #[tokio::test]
    async fn test_update_applies_partial_fields() {
        let repo = InMemoryTaskRepository::new();
        let task = make_task(UserId::generate(), TeamId::generate(), ProjectId::generate());
        repo.insert_task(task.clone()).await.expect("insert should succeed");

        let updated = repo
            .update_task(
                task.task_id,
                TaskUpdate {
                    status: Some(TaskStatus::Done),
                    ..TaskUpdate::default()
                },
            )
            .await
            .expect("update should succeed");

        assert_eq!(updated.status, TaskStatus::Done);
        assert_eq!(updated.title, task.title);
        assert!(updated.updated_at >= task.updated_at);
    }

    #[tokio::test]
    async fn test_update_missing_task_is_not_found() {
        let repo = InMemoryTaskRepository::new();
        let err = repo
            .update_task(TaskId::generate(), TaskUpdate::default())
            .await
            .expect_err("update should fail");
        assert!(matches!(err, RepoError::NotFound(_)));
    }
}

//! Task read/write routes.
//!
//! Reads consult the cache first and repopulate it on miss; writes commit
//! to the repository and then evict the four related cache entries. Cache
//! failures on either path are logged and dropped - the cache accelerates
//! these routes, it never gates them.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use taskhive_core::{ProjectId, Task, TaskId, TaskStatus, TeamId, UserId};

use crate::error::{ApiError, ApiResult};
use crate::repo::TaskUpdate;
use crate::state::AppState;

// ============================================================================
// REQUEST / RESPONSE TYPES
// ============================================================================

/// Body for POST /api/v1/tasks.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTaskRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub owner_id: UserId,
    pub team_id: TeamId,
    pub project_id: ProjectId,
    #[serde(default)]
    pub due_at: Option<DateTime<Utc>>,
}

/// Body for PATCH /api/v1/tasks/:id.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTaskRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<TaskStatus>,
    #[serde(default)]
    pub due_at: Option<DateTime<Utc>>,
}

/// List responses are keyed maps so degraded-access warnings have
/// somewhere to attach.
#[derive(Debug, Clone, Serialize)]
pub struct TaskListResponse {
    pub tasks: Vec<Task>,
    pub count: usize,
}

impl TaskListResponse {
    fn new(tasks: Vec<Task>) -> Self {
        let count = tasks.len();
        Self { tasks, count }
    }
}

// ============================================================================
// READ HANDLERS
// ============================================================================

/// GET /api/v1/tasks/:id - fetch a task, cache first.
pub async fn get_task(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Task>> {
    let task_id = TaskId::new(id);

    if let Some(task) = state.cache.get_task(task_id).await {
        return Ok(Json(task));
    }

    let task = state
        .repo
        .fetch_task(task_id)
        .await?
        .ok_or_else(|| ApiError::task_not_found(task_id))?;

    if let Err(e) = state.cache.cache_task(task_id, &task).await {
        tracing::warn!(task_id = %task_id, error = %e, "failed to repopulate task cache");
    }

    Ok(Json(task))
}

/// GET /api/v1/users/:id/tasks - a user's task list, cache first.
pub async fn list_user_tasks(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<TaskListResponse>> {
    let user_id = UserId::new(id);

    if let Some(tasks) = state.cache.get_user_tasks(user_id).await {
        return Ok(Json(TaskListResponse::new(tasks)));
    }

    let tasks = state.repo.fetch_user_tasks(user_id).await?;

    if let Err(e) = state.cache.cache_user_tasks(user_id, &tasks).await {
        tracing::warn!(user_id = %user_id, error = %e, "failed to repopulate user task list cache");
    }

    Ok(Json(TaskListResponse::new(tasks)))
}

/// GET /api/v1/teams/:id/tasks - a team's task list, cache first.
pub async fn list_team_tasks(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<TaskListResponse>> {
    let team_id = TeamId::new(id);

    if let Some(tasks) = state.cache.get_team_tasks(team_id).await {
        return Ok(Json(TaskListResponse::new(tasks)));
    }

    let tasks = state.repo.fetch_team_tasks(team_id).await?;

    if let Err(e) = state.cache.cache_team_tasks(team_id, &tasks).await {
        tracing::warn!(team_id = %team_id, error = %e, "failed to repopulate team task list cache");
    }

    Ok(Json(TaskListResponse::new(tasks)))
}

/// GET /api/v1/projects/:id/tasks - a project's task list, cache first.
pub async fn list_project_tasks(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<TaskListResponse>> {
    let project_id = ProjectId::new(id);

    if let Some(tasks) = state.cache.get_project_tasks(project_id).await {
        return Ok(Json(TaskListResponse::new(tasks)));
    }

    let tasks = state.repo.fetch_project_tasks(project_id).await?;

    if let Err(e) = state.cache.cache_project_tasks(project_id, &tasks).await {
        tracing::warn!(project_id = %project_id, error = %e, "failed to repopulate project task list cache");
    }

    Ok(Json(TaskListResponse::new(tasks)))
}

// ============================================================================
// WRITE HANDLERS
// ============================================================================

/// POST /api/v1/tasks - create a task and invalidate related caches.
pub async fn create_task(
    State(state): State<AppState>,
    Json(req): Json<CreateTaskRequest>,
) -> ApiResult<(StatusCode, Json<Task>)> {
    if req.title.trim().is_empty() {
        return Err(ApiError::validation_failed("title must not be empty"));
    }

    let mut task = Task::new(req.title, req.owner_id, req.team_id, req.project_id);
    task.description = req.description;
    task.due_at = req.due_at;

    let task = state.repo.insert_task(task).await?;
    invalidate_related(&state, &task).await;

    Ok((StatusCode::CREATED, Json(task)))
}

/// PATCH /api/v1/tasks/:id - update a task and invalidate related caches.
pub async fn update_task(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateTaskRequest>,
) -> ApiResult<Json<Task>> {
    if let Some(title) = &req.title {
        if title.trim().is_empty() {
            return Err(ApiError::validation_failed("title must not be empty"));
        }
    }

    let task_id = TaskId::new(id);
    let task = state
        .repo
        .update_task(
            task_id,
            TaskUpdate {
                title: req.title,
                description: req.description,
                status: req.status,
                due_at: req.due_at,
            },
        )
        .await?;

    invalidate_related(&state, &task).await;

    Ok(Json(task))
}

/// Evict the task entry and the three list views it appears in.
///
/// Partial failure is logged, never raised: the TTL bounds how long a
/// missed eviction can serve a stale list.
async fn invalidate_related(state: &AppState, task: &Task) {
    let outcome = state
        .cache
        .evict_related(task.task_id, task.owner_id, task.team_id, task.project_id)
        .await;
    if !outcome.fully_evicted() {
        tracing::warn!(
            task_id = %task.task_id,
            ?outcome,
            "partial cache invalidation after task write"
        );
    }
}

// ============================================================================
// TESTS
// ============================================================================

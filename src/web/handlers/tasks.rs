//! # Task Handlers
//!
//! `/get_tasks`, `/get_task`, `/create_task`, `/update_task` and `/update_priority`.
//! All of them run behind the session middleware and act only on the caller's tasks.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use axum_extra::extract::WithRejection;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::constants::priority::UNBOUNDED_LIMIT;
use crate::models::{Task, TaskUpdate};
use crate::services::ReorderRequest;
use crate::web::auth::AuthenticatedUser;
use crate::web::errors::{ApiError, ApiResult};
use crate::web::state::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct TaskEnvelope {
    pub task: Task,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TaskListResponse {
    pub tasks: Vec<Task>,
}

#[derive(Debug, Deserialize)]
pub struct TaskListQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    UNBOUNDED_LIMIT
}

#[derive(Debug, Deserialize)]
pub struct TaskQuery {
    pub task_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct NewTaskBody {
    pub title: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    pub task: NewTaskBody,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTaskRequest {
    pub task: TaskUpdate,
}

#[derive(Debug, Deserialize)]
pub struct TargetTask {
    pub id: i64,
}

/// Body of `/update_priority`; an absent neighbor means "moving to that end of the list".
#[derive(Debug, Deserialize)]
pub struct UpdatePriorityRequest {
    pub target_task: TargetTask,
    pub prev_task_priority: Option<i32>,
    pub next_task_priority: Option<i32>,
}

/// List tasks: GET /get_tasks?limit=N
pub async fn get_tasks(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    WithRejection(Query(query), _): WithRejection<Query<TaskListQuery>, ApiError>,
) -> ApiResult<Json<TaskListResponse>> {
    let tasks = state
        .task_service
        .get_tasks(&user.context(), query.limit)
        .await?;

    Ok(Json(TaskListResponse { tasks }))
}

/// Fetch one task: GET /get_task?task_id=N
pub async fn get_task(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    WithRejection(Query(query), _): WithRejection<Query<TaskQuery>, ApiError>,
) -> ApiResult<Json<TaskEnvelope>> {
    let task = state
        .task_service
        .get_task(&user.context(), query.task_id)
        .await?;

    Ok(Json(TaskEnvelope { task }))
}

/// Create a task at the head of the list: POST /create_task
pub async fn create_task(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    WithRejection(Json(request), _): WithRejection<Json<CreateTaskRequest>, ApiError>,
) -> ApiResult<(StatusCode, Json<TaskEnvelope>)> {
    let task = state
        .task_service
        .create_task(&user.context(), request.task.title, request.task.description)
        .await?;

    info!(task_id = task.id, user_id = user.user_id, "Task created via web API");
    Ok((StatusCode::CREATED, Json(TaskEnvelope { task })))
}

/// Replace a task's title, description and status: POST /update_task
pub async fn update_task(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    WithRejection(Json(request), _): WithRejection<Json<UpdateTaskRequest>, ApiError>,
) -> ApiResult<Json<TaskEnvelope>> {
    let task = state
        .task_service
        .update_task(&user.context(), request.task)
        .await?;

    Ok(Json(TaskEnvelope { task }))
}

/// Move a task between two neighbors: POST /update_priority
pub async fn update_priority(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    WithRejection(Json(request), _): WithRejection<Json<UpdatePriorityRequest>, ApiError>,
) -> ApiResult<Json<TaskEnvelope>> {
    let reorder = ReorderRequest::new(
        request.target_task.id,
        request.prev_task_priority,
        request.next_task_priority,
    );
    let task = state
        .task_service
        .reorder_task(&user.context(), reorder)
        .await?;

    Ok(Json(TaskEnvelope { task }))
}

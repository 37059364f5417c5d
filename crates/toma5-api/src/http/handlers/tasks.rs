//! Task handlers: creation, listing, cancellation and the start/complete steps.

use std::time::Instant;

use axum::Json;
use axum::extract::{Path, Query, State};
use serde::Deserialize;
use uuid::Uuid;

use toma5_types::task::{CreatePairedTaskRequest, CreateTaskRequest, Task, TaskId};

use crate::http::error::AppError;
use crate::http::extractors::auth::CurrentActor;
use crate::http::extractors::query::TaskListQuery;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// Body of `POST /tasks`. Two worker ids make a paired assignment.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum CreateTaskBody {
    Paired(CreatePairedTaskRequest),
    Single(CreateTaskRequest),
}

#[derive(Debug, Deserialize)]
pub struct CancelTaskBody {
    #[serde(default)]
    pub reason: String,
}

fn task_links(resp: ApiResponse<serde_json::Value>, id: &TaskId) -> ApiResponse<serde_json::Value> {
    resp.with_link("self", &format!("/api/v1/tasks/{id}"))
        .with_link("checklist", &format!("/api/v1/tasks/{id}/checklist"))
}

fn task_response(task: &Task, start: Instant) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let resp = ApiResponse::timed(serde_json::to_value(task)?, start);
    Ok(Json(task_links(resp, &task.id)))
}

/// POST /api/v1/tasks - Create a task, or a paired assignment.
pub async fn create_task(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Json(body): Json<CreateTaskBody>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let start = Instant::now();

    match body {
        CreateTaskBody::Single(request) => {
            let task = state.engine.create_task(&actor, request).await?;
            task_response(&task, start)
        }
        CreateTaskBody::Paired(request) => {
            let pair = state.engine.create_paired_task(&actor, request).await?;
            let resp = ApiResponse::timed(serde_json::to_value(&pair)?, start)
                .with_link("first", &format!("/api/v1/tasks/{}", pair.tasks[0].id))
                .with_link("second", &format!("/api/v1/tasks/{}", pair.tasks[1].id));
            Ok(Json(resp))
        }
    }
}

/// GET /api/v1/tasks - List tasks visible to the caller.
pub async fn list_tasks(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Query(query): Query<TaskListQuery>,
) -> Result<Json<ApiResponse<Vec<Task>>>, AppError> {
    let start = Instant::now();

    let tasks = state.engine.list_tasks(&actor, query.into_filter()?).await?;

    Ok(Json(
        ApiResponse::timed(tasks, start).with_link("self", "/api/v1/tasks"),
    ))
}

/// GET /api/v1/tasks/{id}
pub async fn get_task(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let start = Instant::now();
    let task = state.engine.get_task(&actor, TaskId(id)).await?;
    task_response(&task, start)
}

/// PUT /api/v1/tasks/{id}/cancel - Supervisor cancellation with a reason.
pub async fn cancel_task(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
    Json(body): Json<CancelTaskBody>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let start = Instant::now();
    let task = state
        .engine
        .cancel_task(&actor, TaskId(id), &body.reason)
        .await?;
    task_response(&task, start)
}

/// PUT /api/v1/tasks/{id}/start
pub async fn start_task(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let start = Instant::now();
    let task = state.engine.start_task(&actor, TaskId(id)).await?;
    task_response(&task, start)
}

/// PUT /api/v1/tasks/{id}/complete
pub async fn complete_task(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let start = Instant::now();
    let task = state.engine.complete_task(&actor, TaskId(id)).await?;
    task_response(&task, start)
}

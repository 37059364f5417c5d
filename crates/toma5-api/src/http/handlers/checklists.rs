//! Checklist handlers: submission by the worker, review by a supervisor.

use std::time::Instant;

use axum::Json;
use axum::extract::{Path, State};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use toma5_types::checklist::{Checklist, ChecklistDetail, ChecklistId, ChecklistSubmission};
use toma5_types::task::{Task, TaskId};

use crate::http::error::AppError;
use crate::http::extractors::auth::CurrentActor;
use crate::http::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RejectChecklistBody {
    #[serde(default)]
    pub comments: String,
}

/// Review outcome: the checklist and its task after the transition.
#[derive(Debug, Serialize)]
pub struct ReviewResult {
    pub task: Task,
    pub checklist: Checklist,
}

fn detail_response(
    detail: ChecklistDetail,
    start: Instant,
) -> Json<ApiResponse<ChecklistDetail>> {
    let self_link = format!("/api/v1/checklists/{}", detail.checklist.id);
    let task_link = format!("/api/v1/tasks/{}", detail.checklist.task_id);
    Json(
        ApiResponse::timed(detail, start)
            .with_link("self", &self_link)
            .with_link("task", &task_link),
    )
}

fn review_response(task: Task, checklist: Checklist, start: Instant) -> Json<ApiResponse<ReviewResult>> {
    let self_link = format!("/api/v1/checklists/{}", checklist.id);
    let task_link = format!("/api/v1/tasks/{}", task.id);
    Json(
        ApiResponse::timed(ReviewResult { task, checklist }, start)
            .with_link("self", &self_link)
            .with_link("task", &task_link),
    )
}

/// POST /api/v1/checklists - Submit or resubmit a task's checklist.
pub async fn submit_checklist(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Json(body): Json<ChecklistSubmission>,
) -> Result<Json<ApiResponse<ChecklistDetail>>, AppError> {
    let start = Instant::now();
    let detail = state.engine.submit_checklist(&actor, body).await?;
    Ok(detail_response(detail, start))
}

/// GET /api/v1/checklists/{id}
pub async fn get_checklist(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<ChecklistDetail>>, AppError> {
    let start = Instant::now();
    let detail = state.engine.get_checklist(&actor, ChecklistId(id)).await?;
    Ok(detail_response(detail, start))
}

/// GET /api/v1/tasks/{id}/checklist
pub async fn get_checklist_by_task(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(task_id): Path<Uuid>,
) -> Result<Json<ApiResponse<ChecklistDetail>>, AppError> {
    let start = Instant::now();
    let detail = state
        .engine
        .get_checklist_by_task(&actor, TaskId(task_id))
        .await?;
    Ok(detail_response(detail, start))
}

/// PUT /api/v1/checklists/{id}/approve
pub async fn approve_checklist(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<ReviewResult>>, AppError> {
    let start = Instant::now();
    let (task, checklist) = state.engine.approve_checklist(&actor, ChecklistId(id)).await?;
    Ok(review_response(task, checklist, start))
}

/// PUT /api/v1/checklists/{id}/reject - Rejection with mandatory comments.
pub async fn reject_checklist(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
    Json(body): Json<RejectChecklistBody>,
) -> Result<Json<ApiResponse<ReviewResult>>, AppError> {
    let start = Instant::now();
    let (task, checklist) = state
        .engine
        .reject_checklist(&actor, ChecklistId(id), &body.comments)
        .await?;
    Ok(review_response(task, checklist, start))
}

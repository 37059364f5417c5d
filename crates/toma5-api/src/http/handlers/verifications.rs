//! Secondary verification (evidence image) handlers.

use std::time::Instant;

use axum::Json;
use axum::extract::{Path, State};
use serde::Deserialize;
use uuid::Uuid;

use toma5_types::checklist::SecondaryVerification;
use toma5_types::task::TaskId;

use crate::http::error::AppError;
use crate::http::extractors::auth::CurrentActor;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// Body of `POST /verifications`. Images are `data:image/...;base64,` URLs.
#[derive(Debug, Deserialize)]
pub struct SubmitVerificationBody {
    pub task_id: Uuid,
    pub image1: String,
    pub image2: String,
}

/// POST /api/v1/verifications
pub async fn submit_verification(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Json(body): Json<SubmitVerificationBody>,
) -> Result<Json<ApiResponse<SecondaryVerification>>, AppError> {
    let start = Instant::now();

    let verification = state
        .engine
        .submit_secondary_verification(&actor, TaskId(body.task_id), &body.image1, &body.image2)
        .await?;

    let task_link = format!("/api/v1/tasks/{}", body.task_id);
    Ok(Json(
        ApiResponse::timed(verification, start)
            .with_link("self", &format!("{task_link}/verification"))
            .with_link("task", &task_link),
    ))
}

/// GET /api/v1/tasks/{id}/verification
pub async fn get_verification_by_task(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(task_id): Path<Uuid>,
) -> Result<Json<ApiResponse<SecondaryVerification>>, AppError> {
    let start = Instant::now();
    let verification = state
        .engine
        .get_secondary_verification_by_task(&actor, TaskId(task_id))
        .await?;
    Ok(Json(
        ApiResponse::timed(verification, start)
            .with_link("task", &format!("/api/v1/tasks/{task_id}")),
    ))
}

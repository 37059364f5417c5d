//! Worker directory handlers.

use std::time::Instant;

use axum::Json;
use axum::extract::{Path, Query, State};
use serde::Deserialize;
use uuid::Uuid;

use toma5_types::actor::WorkerProfile;

use crate::http::error::AppError;
use crate::http::extractors::auth::CurrentActor;
use crate::http::extractors::query::WorkerListQuery;
use crate::http::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AvailabilityBody {
    pub available: bool,
}

/// GET /api/v1/workers - Workers ordered by shift then name.
pub async fn list_workers(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Query(query): Query<WorkerListQuery>,
) -> Result<Json<ApiResponse<Vec<WorkerProfile>>>, AppError> {
    let start = Instant::now();
    let workers = state.engine.list_workers(&actor, query.into()).await?;
    Ok(Json(
        ApiResponse::timed(workers, start).with_link("self", "/api/v1/workers"),
    ))
}

/// GET /api/v1/workers/{id}
pub async fn get_worker(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<WorkerProfile>>, AppError> {
    let start = Instant::now();
    let worker = state.engine.get_worker(&actor, id).await?;
    Ok(Json(
        ApiResponse::timed(worker, start).with_link("self", &format!("/api/v1/workers/{id}")),
    ))
}

/// PUT /api/v1/workers/{id}/availability - Supervisors only.
pub async fn set_availability(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
    Json(body): Json<AvailabilityBody>,
) -> Result<Json<ApiResponse<WorkerProfile>>, AppError> {
    let start = Instant::now();
    let worker = state
        .engine
        .set_worker_availability(&actor, id, body.available)
        .await?;
    Ok(Json(
        ApiResponse::timed(worker, start).with_link("self", &format!("/api/v1/workers/{id}")),
    ))
}

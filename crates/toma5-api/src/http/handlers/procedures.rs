//! Procedure catalog handlers. Read-only; the catalog is maintained outside
//! the service.

use std::time::Instant;

use axum::Json;
use axum::extract::{Path, Query, State};
use uuid::Uuid;

use toma5_types::actor::Actor;
use toma5_types::procedure::Procedure;

use crate::http::error::AppError;
use crate::http::extractors::auth::CurrentActor;
use crate::http::extractors::query::ProcedureListQuery;
use crate::http::response::ApiResponse;
use crate::state::AppState;

async fn catalog(
    state: &AppState,
    actor: &Actor,
    active_only: bool,
) -> Result<Json<ApiResponse<Vec<Procedure>>>, AppError> {
    let start = Instant::now();
    let procedures = state.engine.list_procedures(actor, active_only).await?;
    Ok(Json(
        ApiResponse::timed(procedures, start).with_link("self", "/api/v1/procedures"),
    ))
}

/// GET /api/v1/procedures - The catalog, optionally `?active=true`.
pub async fn list_procedures(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Query(query): Query<ProcedureListQuery>,
) -> Result<Json<ApiResponse<Vec<Procedure>>>, AppError> {
    catalog(&state, &actor, query.active).await
}

/// GET /api/v1/procedures/active
pub async fn list_active_procedures(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
) -> Result<Json<ApiResponse<Vec<Procedure>>>, AppError> {
    catalog(&state, &actor, true).await
}

/// GET /api/v1/procedures/{id}
pub async fn get_procedure(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Procedure>>, AppError> {
    let start = Instant::now();
    let procedure = state.engine.get_procedure(&actor, id).await?;
    Ok(Json(ApiResponse::timed(procedure, start)))
}

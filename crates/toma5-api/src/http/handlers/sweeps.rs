//! Manual trigger of the stale-task sweep.

use std::time::Instant;

use axum::Json;
use axum::extract::State;

use toma5_core::workflow::SweepSummary;

use crate::http::error::AppError;
use crate::http::extractors::auth::CurrentActor;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// POST /api/v1/sweeps - Run the sweep now (supervisors and administrators).
pub async fn run_sweep(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
) -> Result<Json<ApiResponse<SweepSummary>>, AppError> {
    let start = Instant::now();
    let summary = state
        .engine
        .run_stale_sweep_as(&actor, state.engine.now())
        .await?;
    tracing::info!(
        user_id = %actor.user_id,
        cancelled = summary.cancelled,
        "manual sweep finished"
    );
    Ok(Json(
        ApiResponse::timed(summary, start).with_link("tasks", "/api/v1/tasks"),
    ))
}

//! Notification inbox handlers. Every call is scoped to the caller's user id.

use std::time::Instant;

use axum::Json;
use axum::extract::{Path, Query, State};
use uuid::Uuid;

use toma5_types::notification::{Notification, NotificationId, NotificationPage};

use crate::http::error::AppError;
use crate::http::extractors::auth::CurrentActor;
use crate::http::extractors::query::NotificationListQuery;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// GET /api/v1/notifications - One page of the caller's notifications.
pub async fn list_notifications(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Query(query): Query<NotificationListQuery>,
) -> Result<Json<ApiResponse<NotificationPage>>, AppError> {
    let start = Instant::now();
    let page = state.dispatcher.list(&actor.user_id, query.into()).await?;
    Ok(Json(
        ApiResponse::timed(page, start).with_link("self", "/api/v1/notifications"),
    ))
}

/// PUT /api/v1/notifications/{id}/read
pub async fn mark_read(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Notification>>, AppError> {
    let start = Instant::now();
    let notification = state
        .dispatcher
        .mark_read(&NotificationId(id), &actor.user_id)
        .await?;
    Ok(Json(ApiResponse::timed(notification, start)))
}

/// PUT /api/v1/notifications/read-all
pub async fn mark_all_read(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let start = Instant::now();
    let updated = state.dispatcher.mark_all_read(&actor.user_id).await?;
    Ok(Json(
        ApiResponse::timed(serde_json::json!({ "updated": updated }), start)
            .with_link("notifications", "/api/v1/notifications"),
    ))
}

//! Axum router configuration with middleware.
//!
//! All workflow routes are under `/api/v1/`.
//! Middleware: CORS, tracing.
//!
//! Stored evidence images are served read-only from the blob directory under
//! `storage.public_base_url` (default `/media`).

use axum::Router;
use axum::routing::{get, post, put};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use toma5_infra::config::blob_dir;

use crate::http::handlers;
use crate::state::AppState;

/// Build the complete API router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        // Tasks
        .route(
            "/tasks",
            post(handlers::tasks::create_task).get(handlers::tasks::list_tasks),
        )
        .route("/tasks/{id}", get(handlers::tasks::get_task))
        .route("/tasks/{id}/cancel", put(handlers::tasks::cancel_task))
        .route("/tasks/{id}/start", put(handlers::tasks::start_task))
        .route("/tasks/{id}/complete", put(handlers::tasks::complete_task))
        .route(
            "/tasks/{id}/checklist",
            get(handlers::checklists::get_checklist_by_task),
        )
        .route(
            "/tasks/{id}/verification",
            get(handlers::verifications::get_verification_by_task),
        )
        // Checklists
        .route("/checklists", post(handlers::checklists::submit_checklist))
        .route("/checklists/{id}", get(handlers::checklists::get_checklist))
        .route(
            "/checklists/{id}/approve",
            put(handlers::checklists::approve_checklist),
        )
        .route(
            "/checklists/{id}/reject",
            put(handlers::checklists::reject_checklist),
        )
        // Secondary verification
        .route(
            "/verifications",
            post(handlers::verifications::submit_verification),
        )
        // Worker directory
        .route("/workers", get(handlers::workers::list_workers))
        .route("/workers/{id}", get(handlers::workers::get_worker))
        .route(
            "/workers/{id}/availability",
            put(handlers::workers::set_availability),
        )
        // Procedure catalog
        .route("/procedures", get(handlers::procedures::list_procedures))
        .route(
            "/procedures/active",
            get(handlers::procedures::list_active_procedures),
        )
        .route("/procedures/{id}", get(handlers::procedures::get_procedure))
        // Notifications
        .route(
            "/notifications",
            get(handlers::notifications::list_notifications),
        )
        .route(
            "/notifications/read-all",
            put(handlers::notifications::mark_all_read),
        )
        .route(
            "/notifications/{id}/read",
            put(handlers::notifications::mark_read),
        )
        // Maintenance
        .route("/sweeps", post(handlers::sweeps::run_sweep))
        // Live channel
        .route("/ws", get(handlers::ws::ws_handler));

    let media_path = media_mount(&state.config.storage.public_base_url);
    let media = ServeDir::new(blob_dir(&state.config, &state.data_dir));

    Router::new()
        .nest("/api/v1", api_routes)
        .nest_service(&media_path, media)
        .route("/health", get(health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Mount point for blob serving. Absolute URLs (a CDN) are not served locally.
fn media_mount(public_base_url: &str) -> String {
    let path = if public_base_url.contains("://") {
        "/media"
    } else {
        public_base_url.trim_end_matches('/')
    };
    if path.is_empty() || !path.starts_with('/') {
        "/media".to_string()
    } else {
        path.to_string()
    }
}

/// GET /health - Simple health check endpoint (no auth required).
async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

//! Application error type mapping to HTTP status codes and envelope format.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use toma5_types::error::{AuthError, ErrorKind, WorkflowError};

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    /// Engine and dispatcher failures.
    Workflow(WorkflowError),
    /// Authentication failure.
    Unauthorized(String),
    /// Malformed path or query parameter.
    Validation(String),
    /// Generic internal error.
    Internal(String),
}

impl From<WorkflowError> for AppError {
    fn from(e: WorkflowError) -> Self {
        AppError::Workflow(e)
    }
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::Storage(msg) => AppError::Workflow(WorkflowError::Storage(msg)),
            other => AppError::Unauthorized(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::Internal(format!("serialization failed: {e}"))
    }
}

/// HTTP status for a workflow error kind.
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorKind::Forbidden => StatusCode::FORBIDDEN,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::InvalidState => StatusCode::CONFLICT,
        ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
        ErrorKind::UploadFailed => StatusCode::BAD_GATEWAY,
        ErrorKind::Storage => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl AppError {
    /// Status, machine-readable code and message.
    pub fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::Workflow(e) => {
                let kind = e.kind();
                (status_for(kind), kind.as_str(), e.to_string())
            }
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "INVALID_INPUT", msg.clone()),
            AppError::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg.clone())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();

        if status.is_server_error() {
            tracing::error!(code, "{message}");
        } else {
            tracing::debug!(code, "{message}");
        }

        let body = json!({
            "data": null,
            "meta": {
                "request_id": uuid::Uuid::now_v7().to_string(),
                "timestamp": chrono::Utc::now().to_rfc3339(),
                "response_time_ms": 0
            },
            "errors": [{
                "code": code,
                "message": message,
            }]
        });

        (
            status,
            [(axum::http::header::CONTENT_TYPE, "application/json")],
            body.to_string(),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workflow_errors_map_to_statuses() {
        let cases = [
            (WorkflowError::Unauthorized("x".into()), StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            (WorkflowError::forbidden("x"), StatusCode::FORBIDDEN, "FORBIDDEN"),
            (WorkflowError::not_found("task"), StatusCode::NOT_FOUND, "NOT_FOUND"),
            (WorkflowError::invalid_state("x"), StatusCode::CONFLICT, "INVALID_STATE"),
            (WorkflowError::invalid_input("x"), StatusCode::BAD_REQUEST, "INVALID_INPUT"),
            (WorkflowError::UploadFailed("x".into()), StatusCode::BAD_GATEWAY, "UPLOAD_FAILED"),
            (WorkflowError::Storage("x".into()), StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR"),
        ];
        for (err, status, code) in cases {
            let (got_status, got_code, _) = AppError::from(err).parts();
            assert_eq!(got_status, status);
            assert_eq!(got_code, code);
        }
    }

    #[test]
    fn test_auth_errors_are_unauthorized_except_storage() {
        let (status, code, message) = AppError::from(AuthError::SessionInvalidated).parts();
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(code, "UNAUTHORIZED");
        assert!(message.contains("newer login"));

        let (status, code, _) = AppError::from(AuthError::Storage("db down".into())).parts();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(code, "STORAGE_ERROR");
    }

    #[test]
    fn test_into_response_uses_status() {
        let response = AppError::from(WorkflowError::invalid_state("already approved"))
            .into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }
}

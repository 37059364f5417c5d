use serde::{Deserialize, Serialize};
use thiserror::Error;

use std::fmt;

/// Failure of a workflow operation.
///
/// Every variant carries a human-readable explanation; [`WorkflowError::kind`]
/// gives the stable machine-readable code the transport layer maps to a status.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowError {
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Persistence failed; the transition was not committed.
    #[error("storage error: {0}")]
    Storage(String),

    #[error("upload failed: {0}")]
    UploadFailed(String),
}

impl WorkflowError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WorkflowError::Unauthorized(_) => ErrorKind::Unauthorized,
            WorkflowError::Forbidden(_) => ErrorKind::Forbidden,
            WorkflowError::NotFound(_) => ErrorKind::NotFound,
            WorkflowError::InvalidState(_) => ErrorKind::InvalidState,
            WorkflowError::InvalidInput(_) => ErrorKind::InvalidInput,
            WorkflowError::Storage(_) => ErrorKind::Storage,
            WorkflowError::UploadFailed(_) => ErrorKind::UploadFailed,
        }
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        WorkflowError::Forbidden(msg.into())
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        WorkflowError::InvalidState(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        WorkflowError::InvalidInput(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        WorkflowError::NotFound(what.into())
    }
}

/// Stable machine-readable error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    Unauthorized,
    Forbidden,
    NotFound,
    InvalidState,
    InvalidInput,
    #[serde(rename = "STORAGE_ERROR")]
    Storage,
    UploadFailed,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Unauthorized => "UNAUTHORIZED",
            ErrorKind::Forbidden => "FORBIDDEN",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::InvalidState => "INVALID_STATE",
            ErrorKind::InvalidInput => "INVALID_INPUT",
            ErrorKind::Storage => "STORAGE_ERROR",
            ErrorKind::UploadFailed => "UPLOAD_FAILED",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors from repository operations (used by trait definitions in toma5-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),
}

impl From<RepositoryError> for WorkflowError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => WorkflowError::NotFound("entity".to_string()),
            other => WorkflowError::Storage(other.to_string()),
        }
    }
}

/// Failures resolving a bearer token to an actor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("missing or unknown session token")]
    Unauthorized,

    #[error("session was invalidated by a newer login")]
    SessionInvalidated,

    #[error("account is disabled")]
    AccountDisabled,

    #[error("identity store unavailable: {0}")]
    Storage(String),
}

impl From<AuthError> for WorkflowError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Storage(msg) => WorkflowError::Storage(msg),
            other => WorkflowError::Unauthorized(other.to_string()),
        }
    }
}

/// Failures storing evidence images.
#[derive(Debug, Error)]
pub enum BlobError {
    #[error("upload failed: {0}")]
    UploadFailed(String),

    #[error("invalid image reference: {0}")]
    InvalidImage(String),
}

impl From<BlobError> for WorkflowError {
    fn from(err: BlobError) -> Self {
        match err {
            BlobError::UploadFailed(msg) => WorkflowError::UploadFailed(msg),
            BlobError::InvalidImage(msg) => WorkflowError::InvalidInput(msg),
        }
    }
}

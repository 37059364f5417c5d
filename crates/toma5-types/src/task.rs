use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

/// Unique identifier for a task, wrapping a UUID v7 (time-sortable).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(pub Uuid);

impl TaskId {
    /// Create a new TaskId using UUID v7.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Create a TaskId from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TaskId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// A unit of work assigned to one worker.
///
/// Paired assignments are two tasks sharing a `group_id`. Tasks are never
/// deleted; cancelled tasks stay in place with their cancellation actor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub description: String,
    pub location: Option<String>,
    /// Calendar day (in the plant timezone) the task is valid for.
    pub assignment_date: NaiveDate,
    pub state: TaskState,
    /// Worker profile the task is assigned to.
    pub worker_id: Uuid,
    /// Supervisor profile responsible for the task. Absent for worker-created
    /// tasks until a supervisor reviews the checklist.
    pub supervisor_id: Option<Uuid>,
    /// Shared by the two tasks of a paired assignment.
    pub group_id: Option<Uuid>,
    pub created_by_worker: bool,
    pub cancelled_by: Option<CancelledBy>,
    pub cancellation_reason: Option<String>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Task lifecycle states.
///
/// ```text
/// PENDING -> CHECKLIST_SUBMITTED -> READY_TO_START -> IN_PROGRESS -> COMPLETED
///               |        ^   \
///               v        |    -> PENDING_SECONDARY_VERIFICATION -> READY_TO_START
///            UNDER_REVIEW
/// ```
///
/// `CANCELLED` and `AUTO_CANCELLED` are terminal and reachable from every
/// non-terminal state (auto-cancel only from `PENDING`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskState {
    Pending,
    ChecklistSubmitted,
    UnderReview,
    PendingSecondaryVerification,
    ReadyToStart,
    InProgress,
    Completed,
    Cancelled,
    AutoCancelled,
}

impl TaskState {
    pub const ALL: [TaskState; 9] = [
        TaskState::Pending,
        TaskState::ChecklistSubmitted,
        TaskState::UnderReview,
        TaskState::PendingSecondaryVerification,
        TaskState::ReadyToStart,
        TaskState::InProgress,
        TaskState::Completed,
        TaskState::Cancelled,
        TaskState::AutoCancelled,
    ];

    /// Either of the two cancelled states.
    pub fn is_cancelled(self) -> bool {
        matches!(self, TaskState::Cancelled | TaskState::AutoCancelled)
    }

    /// No transition leaves a terminal state.
    pub fn is_terminal(self) -> bool {
        self.is_cancelled() || self == TaskState::Completed
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskState::Pending => "PENDING",
            TaskState::ChecklistSubmitted => "CHECKLIST_SUBMITTED",
            TaskState::UnderReview => "UNDER_REVIEW",
            TaskState::PendingSecondaryVerification => "PENDING_SECONDARY_VERIFICATION",
            TaskState::ReadyToStart => "READY_TO_START",
            TaskState::InProgress => "IN_PROGRESS",
            TaskState::Completed => "COMPLETED",
            TaskState::Cancelled => "CANCELLED",
            TaskState::AutoCancelled => "AUTO_CANCELLED",
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.to_uppercase();
        TaskState::ALL
            .into_iter()
            .find(|state| state.as_str() == upper)
            .ok_or_else(|| format!("invalid task state: '{s}'"))
    }
}

/// Who cancelled a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CancelledBy {
    Worker,
    Supervisor,
    System,
}

impl fmt::Display for CancelledBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CancelledBy::Worker => write!(f, "WORKER"),
            CancelledBy::Supervisor => write!(f, "SUPERVISOR"),
            CancelledBy::System => write!(f, "SYSTEM"),
        }
    }
}

impl FromStr for CancelledBy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "WORKER" => Ok(CancelledBy::Worker),
            "SUPERVISOR" => Ok(CancelledBy::Supervisor),
            "SYSTEM" => Ok(CancelledBy::System),
            other => Err(format!("invalid cancellation actor: '{other}'")),
        }
    }
}

/// Request to create a task for a single worker.
///
/// `worker_id` may be omitted when a worker creates a task for themselves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTaskRequest {
    pub description: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub worker_id: Option<Uuid>,
}

/// Request to create two linked tasks for a worker pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePairedTaskRequest {
    pub description: String,
    #[serde(default)]
    pub location: Option<String>,
    pub first_worker_id: Uuid,
    pub second_worker_id: Uuid,
}

/// Both tasks of a paired assignment, created atomically.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskPair {
    pub group_id: Uuid,
    pub tasks: [Task; 2],
}

//! Task transition table.
//!
//! The single function every engine operation (and the sweeper) goes through
//! to move a task between states. Decision logic only: no I/O.

use toma5_types::error::WorkflowError;
use toma5_types::task::TaskState;

/// A requested task transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskEvent {
    SubmitChecklist,
    /// Supervisor approval. The target depends on the checklist's derived flag.
    Approve { requires_verification: bool },
    Reject,
    SubmitVerification,
    Start,
    Complete,
    Cancel,
    AutoCancel,
}

impl TaskEvent {
    fn describe(self) -> &'static str {
        match self {
            TaskEvent::SubmitChecklist => "submit a checklist",
            TaskEvent::Approve { .. } => "approve the checklist",
            TaskEvent::Reject => "reject the checklist",
            TaskEvent::SubmitVerification => "submit the secondary verification",
            TaskEvent::Start => "start",
            TaskEvent::Complete => "complete",
            TaskEvent::Cancel => "cancel",
            TaskEvent::AutoCancel => "auto-cancel",
        }
    }
}

/// The legal target state for `event` from `from`, if any.
pub fn next_state(from: TaskState, event: TaskEvent) -> Option<TaskState> {
    use TaskState::*;
    match (from, event) {
        (Pending | UnderReview, TaskEvent::SubmitChecklist) => Some(ChecklistSubmitted),
        (ChecklistSubmitted, TaskEvent::Approve { requires_verification: true }) => {
            Some(PendingSecondaryVerification)
        }
        (ChecklistSubmitted, TaskEvent::Approve { requires_verification: false }) => {
            Some(ReadyToStart)
        }
        (ChecklistSubmitted, TaskEvent::Reject) => Some(UnderReview),
        (PendingSecondaryVerification, TaskEvent::SubmitVerification) => Some(ReadyToStart),
        (ReadyToStart, TaskEvent::Start) => Some(InProgress),
        (InProgress, TaskEvent::Complete) => Some(Completed),
        (state, TaskEvent::Cancel) if !state.is_terminal() => Some(Cancelled),
        (Pending, TaskEvent::AutoCancel) => Some(AutoCancelled),
        _ => None,
    }
}

/// Like [`next_state`], but explains an illegal transition as `InvalidState`.
pub fn transition(from: TaskState, event: TaskEvent) -> Result<TaskState, WorkflowError> {
    if let Some(to) = next_state(from, event) {
        return Ok(to);
    }
    let reason = if from.is_cancelled() {
        "task is already cancelled".to_string()
    } else if from == TaskState::Completed {
        "task is already completed".to_string()
    } else {
        format!("task is {from}")
    };
    Err(WorkflowError::invalid_state(format!(
        "cannot {}: {reason}",
        event.describe()
    )))
}

//! Typed construction of every workflow notification.
//!
//! One builder per [`NotificationKind`]; the engine never formats titles or
//! payloads itself.

use serde_json::json;
use toma5_types::actor::WorkerProfile;
use toma5_types::checklist::{Checklist, SecondaryVerification};
use toma5_types::notification::NotificationKind;
use toma5_types::task::Task;
use uuid::Uuid;

/// A notification waiting to be dispatched.
#[derive(Debug, Clone, PartialEq)]
pub struct Outgoing {
    /// User account to notify.
    pub recipient_id: Uuid,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub payload: serde_json::Value,
}

impl Outgoing {
    pub fn new(
        recipient_id: Uuid,
        kind: NotificationKind,
        title: impl Into<String>,
        message: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            recipient_id,
            kind,
            title: title.into(),
            message: message.into(),
            payload,
        }
    }
}

fn task_payload(task: &Task) -> serde_json::Value {
    json!({
        "task_id": task.id,
        "description": task.description,
        "location": task.location,
        "assignment_date": task.assignment_date,
        "state": task.state,
        "group_id": task.group_id,
    })
}

pub fn task_assigned(worker_user: Uuid, task: &Task) -> Outgoing {
    let message = match &task.location {
        Some(location) => format!("{} at {location}", task.description),
        None => task.description.clone(),
    };
    Outgoing::new(
        worker_user,
        NotificationKind::TaskAssigned,
        "New task assigned",
        message,
        task_payload(task),
    )
}

pub fn task_cancelled(worker_user: Uuid, task: &Task) -> Outgoing {
    let reason = task.cancellation_reason.as_deref().unwrap_or("no reason given");
    let mut payload = task_payload(task);
    payload["reason"] = json!(task.cancellation_reason);
    Outgoing::new(
        worker_user,
        NotificationKind::TaskCancelled,
        "Task cancelled",
        format!("'{}' was cancelled: {reason}", task.description),
        payload,
    )
}

pub fn task_auto_cancelled(worker_user: Uuid, task: &Task) -> Outgoing {
    Outgoing::new(
        worker_user,
        NotificationKind::TaskAutoCancelled,
        "Task expired",
        format!(
            "'{}' from {} was cancelled automatically because no checklist was submitted",
            task.description, task.assignment_date
        ),
        task_payload(task),
    )
}

pub fn checklist_submitted(
    supervisor_user: Uuid,
    task: &Task,
    checklist: &Checklist,
    worker_name: &str,
) -> Outgoing {
    let mut payload = task_payload(task);
    payload["checklist_id"] = json!(checklist.id);
    payload["requires_secondary_verification"] = json!(checklist.requires_secondary_verification);
    payload["worker_name"] = json!(worker_name);
    Outgoing::new(
        supervisor_user,
        NotificationKind::ChecklistSubmitted,
        "Checklist awaiting review",
        format!("{worker_name} submitted a checklist for '{}'", task.description),
        payload,
    )
}

pub fn checklist_approved(worker_user: Uuid, task: &Task, checklist: &Checklist) -> Outgoing {
    let message = if checklist.requires_secondary_verification {
        format!(
            "Checklist for '{}' approved; upload the secondary verification photos",
            task.description
        )
    } else {
        format!("Checklist for '{}' approved; the task is ready to start", task.description)
    };
    let mut payload = task_payload(task);
    payload["checklist_id"] = json!(checklist.id);
    payload["requires_secondary_verification"] = json!(checklist.requires_secondary_verification);
    Outgoing::new(
        worker_user,
        NotificationKind::ChecklistApproved,
        "Checklist approved",
        message,
        payload,
    )
}

pub fn checklist_rejected(worker_user: Uuid, task: &Task, checklist: &Checklist) -> Outgoing {
    let comments = checklist.reviewer_comments.as_deref().unwrap_or_default();
    let mut payload = task_payload(task);
    payload["checklist_id"] = json!(checklist.id);
    payload["reviewer_comments"] = json!(checklist.reviewer_comments);
    Outgoing::new(
        worker_user,
        NotificationKind::ChecklistRejected,
        "Checklist rejected",
        format!("Checklist for '{}' was rejected: {comments}", task.description),
        payload,
    )
}

pub fn verification_submitted(
    supervisor_user: Uuid,
    task: &Task,
    verification: &SecondaryVerification,
) -> Outgoing {
    let mut payload = task_payload(task);
    payload["checklist_id"] = json!(verification.checklist_id);
    payload["verification_id"] = json!(verification.id);
    Outgoing::new(
        supervisor_user,
        NotificationKind::SecondaryVerificationSubmitted,
        "Secondary verification uploaded",
        format!("Evidence photos uploaded for '{}'", task.description),
        payload,
    )
}

pub fn sweep_completed(supervisor_user: Uuid, cancelled: usize, task_ids: &[Uuid]) -> Outgoing {
    Outgoing::new(
        supervisor_user,
        NotificationKind::SweepCompleted,
        "Stale tasks cancelled",
        format!("{cancelled} pending task(s) from previous days were cancelled automatically"),
        json!({ "cancelled": cancelled, "task_ids": task_ids }),
    )
}

pub fn worker_unavailable(worker: &WorkerProfile) -> Outgoing {
    Outgoing::new(
        worker.user_id,
        NotificationKind::WorkerUnavailable,
        "Availability changed",
        "A supervisor marked you as not available today",
        json!({ "worker_id": worker.id, "available": worker.available }),
    )
}

//! Notification catalog and persisted notification records.
//!
//! Every event the workflow emits is one of the closed set of
//! [`NotificationKind`] variants. A notification is persisted first and then
//! pushed best-effort over the live channel as a [`LiveEvent`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

/// Unique identifier for a persisted notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NotificationId(pub Uuid);

impl NotificationId {
    /// Create a new NotificationId using UUID v7.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for NotificationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for NotificationId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// The closed catalog of workflow events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    TaskAssigned,
    TaskCancelled,
    TaskAutoCancelled,
    ChecklistSubmitted,
    ChecklistApproved,
    ChecklistRejected,
    SecondaryVerificationSubmitted,
    SweepCompleted,
    /// A supervisor marked the worker unavailable for today.
    WorkerUnavailable,
}

impl NotificationKind {
    pub const ALL: [NotificationKind; 9] = [
        NotificationKind::TaskAssigned,
        NotificationKind::TaskCancelled,
        NotificationKind::TaskAutoCancelled,
        NotificationKind::ChecklistSubmitted,
        NotificationKind::ChecklistApproved,
        NotificationKind::ChecklistRejected,
        NotificationKind::SecondaryVerificationSubmitted,
        NotificationKind::SweepCompleted,
        NotificationKind::WorkerUnavailable,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            NotificationKind::TaskAssigned => "TASK_ASSIGNED",
            NotificationKind::TaskCancelled => "TASK_CANCELLED",
            NotificationKind::TaskAutoCancelled => "TASK_AUTO_CANCELLED",
            NotificationKind::ChecklistSubmitted => "CHECKLIST_SUBMITTED",
            NotificationKind::ChecklistApproved => "CHECKLIST_APPROVED",
            NotificationKind::ChecklistRejected => "CHECKLIST_REJECTED",
            NotificationKind::SecondaryVerificationSubmitted => {
                "SECONDARY_VERIFICATION_SUBMITTED"
            }
            NotificationKind::SweepCompleted => "SWEEP_COMPLETED",
            NotificationKind::WorkerUnavailable => "WORKER_UNAVAILABLE",
        }
    }

    /// Event name used on the live channel.
    pub fn event_name(self) -> &'static str {
        match self {
            NotificationKind::TaskAssigned => "task-assigned",
            NotificationKind::TaskCancelled => "task-cancelled",
            NotificationKind::TaskAutoCancelled => "task-auto-cancelled",
            NotificationKind::ChecklistSubmitted => "checklist-submitted",
            NotificationKind::ChecklistApproved => "checklist-approved",
            NotificationKind::ChecklistRejected => "checklist-rejected",
            NotificationKind::SecondaryVerificationSubmitted => "secondary-verification-submitted",
            NotificationKind::SweepCompleted => "sweep-completed",
            NotificationKind::WorkerUnavailable => "availability-changed",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NotificationKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("invalid notification kind: '{s}'"))
    }
}

/// A persisted notification addressed to one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    /// User account the notification is addressed to.
    pub recipient_id: Uuid,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub payload: serde_json::Value,
    pub read: bool,
    pub created_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
}

/// One page of a recipient's notifications, newest first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationPage {
    pub items: Vec<Notification>,
    /// Total matching the query (respects `only_unread`).
    pub total: u64,
    /// Total unread for the recipient regardless of the query.
    pub unread_total: u64,
    pub page: u32,
    pub total_pages: u32,
}

/// Frame pushed over the live channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveEvent {
    pub event: String,
    pub payload: serde_json::Value,
}

impl LiveEvent {
    pub fn new(event: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            event: event.into(),
            payload,
        }
    }

    /// Live frame announcing a freshly persisted notification.
    pub fn from_notification(notification: &Notification) -> Self {
        Self::new(
            notification.kind.event_name(),
            serde_json::json!({
                "id": notification.id,
                "kind": notification.kind,
                "title": notification.title,
                "message": notification.message,
                "payload": notification.payload,
                "read": notification.read,
                "created_at": notification.created_at,
            }),
        )
    }
}

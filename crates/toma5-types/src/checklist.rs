use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

use crate::procedure::Procedure;
use crate::task::TaskId;

/// Number of steps in the five-point risk questionnaire.
pub const CHECKLIST_STEPS: u8 = 5;

/// Unique identifier for a checklist, wrapping a UUID v7 (time-sortable).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChecklistId(pub Uuid);

impl ChecklistId {
    /// Create a new ChecklistId using UUID v7.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Create a ChecklistId from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for ChecklistId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ChecklistId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ChecklistId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// The five-point risk questionnaire instance attached to a task.
///
/// `requires_secondary_verification` is derived from the answers on every
/// submission and never set by hand. `approved` is `None` while the checklist
/// waits for review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checklist {
    pub id: ChecklistId,
    pub task_id: TaskId,
    /// Worker profile that submitted the latest answers.
    pub worker_id: Uuid,
    pub submitted_at: DateTime<Utc>,
    pub procedure_id: Option<Uuid>,
    pub additional_hazards: Option<String>,
    pub comments: Option<String>,
    pub requires_secondary_verification: bool,
    pub approved: Option<bool>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub reviewer_comments: Option<String>,
}

impl Checklist {
    /// Current review decision.
    pub fn review_status(&self) -> ReviewStatus {
        match self.approved {
            None => ReviewStatus::Pending,
            Some(true) => ReviewStatus::Approved,
            Some(false) => ReviewStatus::Rejected,
        }
    }
}

/// Review decision of a checklist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewStatus {
    Pending,
    Approved,
    Rejected,
}

/// One answered question of a checklist submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistAnswer {
    /// 1-based step number within the questionnaire.
    pub step: u8,
    pub question: String,
    pub answer: bool,
}

impl ChecklistAnswer {
    pub fn new(step: u8, question: impl Into<String>, answer: bool) -> Self {
        Self {
            step,
            question: question.into(),
            answer,
        }
    }
}

/// Payload of a checklist (re)submission. Replaces every prior answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChecklistSubmission {
    pub task_id: TaskId,
    pub answers: Vec<ChecklistAnswer>,
    #[serde(default)]
    pub procedure_id: Option<Uuid>,
    #[serde(default)]
    pub additional_hazards: Option<String>,
    #[serde(default)]
    pub comments: Option<String>,
}

/// Photographic evidence ("ASST") required when the checklist flags elevated risk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecondaryVerification {
    pub id: Uuid,
    pub checklist_id: ChecklistId,
    pub image1_url: String,
    pub image2_url: String,
    pub uploaded_at: DateTime<Utc>,
}

/// A checklist together with its answers (ordered by step), evidence and
/// the procedure it references.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChecklistDetail {
    pub checklist: Checklist,
    pub answers: Vec<ChecklistAnswer>,
    pub verification: Option<SecondaryVerification>,
    #[serde(default)]
    pub procedure: Option<Procedure>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(approved: Option<bool>) -> Checklist {
        Checklist {
            id: ChecklistId::new(),
            task_id: TaskId::new(),
            worker_id: Uuid::now_v7(),
            submitted_at: Utc::now(),
            procedure_id: None,
            additional_hazards: None,
            comments: None,
            requires_secondary_verification: false,
            approved,
            reviewed_at: None,
            reviewer_comments: None,
        }
    }

    #[test]
    fn test_review_status_from_tri_state_flag() {
        assert_eq!(sample(None).review_status(), ReviewStatus::Pending);
        assert_eq!(sample(Some(true)).review_status(), ReviewStatus::Approved);
        assert_eq!(sample(Some(false)).review_status(), ReviewStatus::Rejected);
    }

    #[test]
    fn test_submission_optional_fields_default() {
        let json = format!(
            r#"{{"task_id":"{}","answers":[{{"step":1,"question":"q","answer":true}}]}}"#,
            Uuid::now_v7()
        );
        let submission: ChecklistSubmission = serde_json::from_str(&json).unwrap();
        assert_eq!(submission.answers.len(), 1);
        assert!(submission.procedure_id.is_none());
        assert!(submission.comments.is_none());
    }
}

//! Work procedures a checklist can reference.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A documented work procedure. Inactive procedures stay readable but can
/// no longer be attached to a new submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Procedure {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    /// Link to the procedure document (PDF).
    pub document_url: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

//! Query parameter extractors for list endpoints.

use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use toma5_core::repository::SortOrder;
use toma5_core::repository::directory::WorkerFilter;
use toma5_core::repository::notification::NotificationQuery;
use toma5_core::repository::workflow::TaskFilter;
use toma5_types::task::TaskState;

use crate::http::error::AppError;

/// Query parameters for the task list endpoint.
///
/// Role scoping is applied by the engine on top of these filters.
#[derive(Debug, Deserialize, Default)]
pub struct TaskListQuery {
    /// Assignment date, `YYYY-MM-DD`.
    pub date: Option<NaiveDate>,
    /// Task state, e.g. `PENDING` (case-insensitive).
    pub state: Option<String>,
    pub worker_id: Option<Uuid>,
    pub supervisor_id: Option<Uuid>,
    /// Sort order by creation time (asc, desc).
    #[serde(default = "default_order")]
    pub order: String,
}

fn default_order() -> String {
    "desc".to_string()
}

impl TaskListQuery {
    pub fn into_filter(self) -> Result<TaskFilter, AppError> {
        let state = match &self.state {
            Some(s) => Some(s.parse::<TaskState>().map_err(AppError::Validation)?),
            None => None,
        };
        let sort_order = match self.order.to_lowercase().as_str() {
            "asc" => SortOrder::Asc,
            "desc" => SortOrder::Desc,
            other => {
                return Err(AppError::Validation(format!(
                    "invalid order '{other}': expected asc or desc"
                )));
            }
        };
        Ok(TaskFilter {
            assignment_date: self.date,
            state,
            worker_id: self.worker_id,
            supervisor_id: self.supervisor_id,
            include_unsupervised: false,
            sort_order,
        })
    }
}

/// Query parameters for the notification list endpoint.
#[derive(Debug, Deserialize, Default)]
pub struct NotificationListQuery {
    pub limit: Option<u32>,
    /// 1-based page number.
    pub page: Option<u32>,
    /// Only unread notifications.
    #[serde(default)]
    pub unread: bool,
}

impl From<NotificationListQuery> for NotificationQuery {
    fn from(q: NotificationListQuery) -> Self {
        NotificationQuery {
            limit: q.limit.unwrap_or(NotificationQuery::DEFAULT_LIMIT),
            page: q.page.unwrap_or(1),
            only_unread: q.unread,
        }
    }
}

/// Query parameters for the worker directory.
#[derive(Debug, Deserialize, Default)]
pub struct WorkerListQuery {
    /// Shift name, case-insensitive.
    pub shift: Option<String>,
    pub available: Option<bool>,
}

impl From<WorkerListQuery> for WorkerFilter {
    fn from(q: WorkerListQuery) -> Self {
        WorkerFilter {
            shift: q.shift,
            available: q.available,
        }
    }
}

/// Query parameters for the procedure catalog. Defaults to the whole catalog.
#[derive(Debug, Deserialize, Default)]
pub struct ProcedureListQuery {
    /// Only procedures that can still be referenced by a checklist.
    #[serde(default)]
    pub active: bool,
}

//! Stale-task sweep: auto-cancels `PENDING` tasks from previous days.
//!
//! Each task is cancelled in its own guarded transition through the same
//! transition table as every other operation. A failing task is counted and
//! logged; the sweep carries on with the rest.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use serde_json::json;
use toma5_types::actor::{Actor, Capability};
use toma5_types::error::WorkflowError;
use toma5_types::notification::{LiveEvent, NotificationKind};
use toma5_types::task::{CancelledBy, Task, TaskId, TaskState};
use tracing::{info, warn};

use super::clock::local_day;
use super::engine::{WorkflowEngine, authorize, log_transition};
use super::guard::EntityKey;
use super::state::{TaskEvent, transition};
use crate::notification::catalog;
use crate::repository::blob::BlobStore;
use crate::repository::directory::DirectoryRepository;
use crate::repository::workflow::WorkflowRepository;

/// Outcome of one sweep run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepSummary {
    /// Calendar day (plant timezone) the sweep ran for.
    pub day: Option<NaiveDate>,
    /// Candidates found stale at the start of the run.
    pub examined: usize,
    pub cancelled: usize,
    /// Candidates that left `PENDING` before their turn came.
    pub skipped: usize,
    pub failed: usize,
    pub cancelled_task_ids: Vec<TaskId>,
}

impl<W, D, B> WorkflowEngine<W, D, B>
where
    W: WorkflowRepository,
    D: DirectoryRepository,
    B: BlobStore,
{
    /// Manual sweep on behalf of an actor holding `RunSweep`.
    pub async fn run_stale_sweep_as(
        &self,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> Result<SweepSummary, WorkflowError> {
        authorize(actor, Capability::RunSweep)?;
        self.run_stale_sweep(now).await
    }

    /// Auto-cancel every `PENDING` task assigned before the current day.
    ///
    /// Safe to re-run: a second run right after a successful one finds no
    /// candidates.
    pub async fn run_stale_sweep(&self, now: DateTime<Utc>) -> Result<SweepSummary, WorkflowError> {
        let system = Actor::system();
        let today = local_day(now, self.timezone());
        let candidates = self.repo.list_stale_pending(today).await?;

        let mut summary = SweepSummary {
            day: Some(today),
            examined: candidates.len(),
            ..SweepSummary::default()
        };

        for candidate in candidates {
            match self.auto_cancel(&system, candidate.id, today, now).await {
                Ok(Some(task)) => {
                    summary.cancelled += 1;
                    summary.cancelled_task_ids.push(task.id);
                    if let Some(user) = self.worker_user(&task.worker_id).await {
                        self.enqueue(vec![catalog::task_auto_cancelled(user, &task)]);
                    }
                }
                Ok(None) => summary.skipped += 1,
                Err(e) => {
                    summary.failed += 1;
                    warn!(task_id = %candidate.id, error = %e, "auto-cancel failed");
                }
            }
        }

        if summary.cancelled > 0 {
            self.announce_sweep(&summary).await;
        }

        info!(
            day = %today,
            examined = summary.examined,
            cancelled = summary.cancelled,
            skipped = summary.skipped,
            failed = summary.failed,
            "stale-task sweep finished"
        );
        Ok(summary)
    }

    /// `PENDING -> AUTO_CANCELLED` for a task assigned before `today`.
    ///
    /// Returns `None` when the task already left `PENDING`, which happens when
    /// a worker acted between the candidate listing and this transition.
    pub async fn auto_cancel(
        &self,
        actor: &Actor,
        task_id: TaskId,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<Option<Task>, WorkflowError> {
        authorize(actor, Capability::AutoCancel)?;

        let _lock = self.guard.lock(EntityKey::Task(task_id.0)).await;
        let mut task = self.load_task(&task_id).await?;
        if task.state != TaskState::Pending {
            return Ok(None);
        }
        if task.assignment_date >= today {
            return Err(WorkflowError::invalid_state(format!(
                "task is assigned for {}, not before {today}",
                task.assignment_date
            )));
        }
        let from = task.state;
        task.state = transition(from, TaskEvent::AutoCancel)?;
        task.cancelled_by = Some(CancelledBy::System);
        task.cancellation_reason = None;
        task.cancelled_at = Some(now);
        task.updated_at = now;

        self.repo.update_task(&task).await?;
        log_transition(&task, from, actor);
        Ok(Some(task))
    }

    async fn announce_sweep(&self, summary: &SweepSummary) {
        let task_ids: Vec<_> = summary.cancelled_task_ids.iter().map(|id| id.0).collect();
        self.outbox.broadcast(LiveEvent::new(
            NotificationKind::SweepCompleted.event_name(),
            json!({
                "day": summary.day,
                "cancelled": summary.cancelled,
                "failed": summary.failed,
                "task_ids": task_ids,
            }),
        ));

        match self.directory.list_active_supervisors().await {
            Ok(supervisors) => {
                let notes = supervisors
                    .into_iter()
                    .map(|s| catalog::sweep_completed(s.user_id, summary.cancelled, &task_ids))
                    .collect();
                self.enqueue(notes);
            }
            Err(e) => warn!(error = %e, "could not load supervisors for sweep summary"),
        }
    }
}

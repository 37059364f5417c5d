//! Checklist submission and supervisor review.

use toma5_types::actor::{Actor, Capability};
use toma5_types::checklist::{
    Checklist, ChecklistDetail, ChecklistId, ChecklistSubmission, ReviewStatus,
};
use toma5_types::error::WorkflowError;
use toma5_types::task::{Task, TaskId};

use super::engine::{
    WorkflowEngine, authorize, ensure_assigned, log_transition, non_blank, required_text,
};
use super::evaluator::{requires_secondary_verification, validate_answers};
use super::guard::{EntityKey, EntityLock};
use super::state::{TaskEvent, transition};
use crate::notification::catalog;
use crate::repository::blob::BlobStore;
use crate::repository::directory::DirectoryRepository;
use crate::repository::procedure::ProcedureRepository;
use crate::repository::workflow::WorkflowRepository;

/// Both entity locks held during a review, task first.
struct ReviewLocks<'a> {
    _task: EntityLock<'a>,
    _checklist: EntityLock<'a>,
}

impl<W, D, B> WorkflowEngine<W, D, B>
where
    W: WorkflowRepository,
    D: DirectoryRepository,
    B: BlobStore,
{
    /// Submit (or resubmit) the checklist of a task.
    ///
    /// Every submission replaces the whole answer set, recomputes the
    /// secondary-verification flag and resets the review decision to pending.
    pub async fn submit_checklist(
        &self,
        actor: &Actor,
        submission: ChecklistSubmission,
    ) -> Result<ChecklistDetail, WorkflowError> {
        authorize(actor, Capability::SubmitChecklist)?;
        let me = self.acting_worker(actor).await?;
        let task_id = submission.task_id;

        let (task, checklist, procedure) = {
            let _task_lock = self.guard.lock(EntityKey::Task(task_id.0)).await;
            let mut task = self.load_task(&task_id).await?;
            ensure_assigned(&task, &me)?;

            let existing = self.repo.get_checklist_by_task(&task_id).await?;
            if existing
                .as_ref()
                .is_some_and(|c| c.review_status() == ReviewStatus::Approved)
            {
                return Err(WorkflowError::invalid_state(
                    "the checklist of this task is already approved",
                ));
            }
            let from = task.state;
            let to = transition(from, TaskEvent::SubmitChecklist)?;
            validate_answers(&submission.answers)?;
            let procedure = match &submission.procedure_id {
                Some(id) => Some(self.attachable_procedure(id).await?),
                None => None,
            };

            let checklist_id = existing.as_ref().map(|c| c.id).unwrap_or_default();
            let _checklist_lock = self.guard.lock(EntityKey::Checklist(checklist_id.0)).await;

            let now = self.now();
            let checklist = Checklist {
                id: checklist_id,
                task_id,
                worker_id: me.id,
                submitted_at: now,
                procedure_id: submission.procedure_id,
                additional_hazards: non_blank(submission.additional_hazards.as_deref()),
                comments: non_blank(submission.comments.as_deref()),
                requires_secondary_verification: requires_secondary_verification(
                    &submission.answers,
                ),
                approved: None,
                reviewed_at: None,
                reviewer_comments: None,
            };
            task.state = to;
            task.updated_at = now;

            self.repo
                .commit_submission(&task, &checklist, &submission.answers)
                .await?;
            log_transition(&task, from, actor);
            (task, checklist, procedure)
        };

        let notes = self
            .supervisor_users(task.supervisor_id)
            .await
            .into_iter()
            .map(|user| catalog::checklist_submitted(user, &task, &checklist, &me.full_name))
            .collect();
        self.enqueue(notes);

        // Stable sort: repeated steps keep their submission order.
        let mut answers = submission.answers;
        answers.sort_by_key(|a| a.step);
        Ok(ChecklistDetail {
            checklist,
            answers,
            verification: None,
            procedure,
        })
    }

    /// Approve a pending checklist. The task moves to
    /// `PENDING_SECONDARY_VERIFICATION` or straight to `READY_TO_START`.
    pub async fn approve_checklist(
        &self,
        actor: &Actor,
        checklist_id: ChecklistId,
    ) -> Result<(Task, Checklist), WorkflowError> {
        authorize(actor, Capability::ReviewChecklist)?;
        let supervisor = self.acting_supervisor(actor).await?;

        let (task, checklist) = {
            let (_locks, mut task, mut checklist) = self.lock_for_review(checklist_id).await?;
            match checklist.review_status() {
                ReviewStatus::Approved => {
                    return Err(WorkflowError::invalid_state("checklist is already approved"));
                }
                ReviewStatus::Rejected => {
                    return Err(WorkflowError::invalid_state(
                        "checklist was rejected and awaits resubmission",
                    ));
                }
                ReviewStatus::Pending => {}
            }
            let from = task.state;
            let to = transition(
                from,
                TaskEvent::Approve {
                    requires_verification: checklist.requires_secondary_verification,
                },
            )?;

            let now = self.now();
            checklist.approved = Some(true);
            checklist.reviewed_at = Some(now);
            task.state = to;
            task.supervisor_id.get_or_insert(supervisor.id);
            task.updated_at = now;

            self.repo.commit_review(&task, &checklist).await?;
            log_transition(&task, from, actor);
            (task, checklist)
        };

        if let Some(user) = self.worker_user(&task.worker_id).await {
            self.enqueue(vec![catalog::checklist_approved(user, &task, &checklist)]);
        }
        Ok((task, checklist))
    }

    /// Reject a pending checklist with mandatory reviewer comments. The task
    /// moves to `UNDER_REVIEW` until the worker resubmits.
    pub async fn reject_checklist(
        &self,
        actor: &Actor,
        checklist_id: ChecklistId,
        comments: &str,
    ) -> Result<(Task, Checklist), WorkflowError> {
        authorize(actor, Capability::ReviewChecklist)?;
        let supervisor = self.acting_supervisor(actor).await?;

        let (task, checklist) = {
            let (_locks, mut task, mut checklist) = self.lock_for_review(checklist_id).await?;
            match checklist.review_status() {
                ReviewStatus::Approved => {
                    return Err(WorkflowError::invalid_state(
                        "an approved checklist cannot be rejected",
                    ));
                }
                ReviewStatus::Rejected => {
                    return Err(WorkflowError::invalid_state("checklist is already rejected"));
                }
                ReviewStatus::Pending => {}
            }
            let from = task.state;
            let to = transition(from, TaskEvent::Reject)?;
            let comments = required_text(comments, "reviewer comments")?;

            let now = self.now();
            checklist.approved = Some(false);
            checklist.reviewed_at = Some(now);
            checklist.reviewer_comments = Some(comments);
            task.state = to;
            task.supervisor_id.get_or_insert(supervisor.id);
            task.updated_at = now;

            self.repo.commit_review(&task, &checklist).await?;
            log_transition(&task, from, actor);
            (task, checklist)
        };

        if let Some(user) = self.worker_user(&task.worker_id).await {
            self.enqueue(vec![catalog::checklist_rejected(user, &task, &checklist)]);
        }
        Ok((task, checklist))
    }

    /// A checklist with its answers (by step), its verification and its
    /// procedure, if any.
    pub async fn get_checklist(
        &self,
        actor: &Actor,
        checklist_id: ChecklistId,
    ) -> Result<ChecklistDetail, WorkflowError> {
        authorize(actor, Capability::ViewTask)?;
        let me = self.viewing_worker(actor).await?;
        let checklist = self
            .repo
            .get_checklist(&checklist_id)
            .await?
            .ok_or_else(|| WorkflowError::not_found(format!("checklist {checklist_id}")))?;
        if let Some(me) = me {
            ensure_assigned(&self.load_task(&checklist.task_id).await?, &me)?;
        }
        self.checklist_detail(checklist).await
    }

    pub async fn get_checklist_by_task(
        &self,
        actor: &Actor,
        task_id: TaskId,
    ) -> Result<ChecklistDetail, WorkflowError> {
        authorize(actor, Capability::ViewTask)?;
        let me = self.viewing_worker(actor).await?;
        let task = self.load_task(&task_id).await?;
        if let Some(me) = me {
            ensure_assigned(&task, &me)?;
        }
        let checklist = self
            .repo
            .get_checklist_by_task(&task_id)
            .await?
            .ok_or_else(|| WorkflowError::not_found(format!("checklist for task {task_id}")))?;
        self.checklist_detail(checklist).await
    }

    pub(crate) async fn checklist_detail(
        &self,
        checklist: Checklist,
    ) -> Result<ChecklistDetail, WorkflowError> {
        let answers = self.repo.get_answers(&checklist.id).await?;
        let verification = self.repo.get_verification(&checklist.id).await?;
        let procedure = match &checklist.procedure_id {
            Some(id) => self.repo.get_procedure(id).await?,
            None => None,
        };
        Ok(ChecklistDetail {
            checklist,
            answers,
            verification,
            procedure,
        })
    }

    /// Lock the checklist's task, then the checklist, and reload both.
    async fn lock_for_review(
        &self,
        checklist_id: ChecklistId,
    ) -> Result<(ReviewLocks<'_>, Task, Checklist), WorkflowError> {
        let not_found = || WorkflowError::not_found(format!("checklist {checklist_id}"));
        let peek = self
            .repo
            .get_checklist(&checklist_id)
            .await?
            .ok_or_else(not_found)?;

        let task_lock = self.guard.lock(EntityKey::Task(peek.task_id.0)).await;
        let checklist_lock = self.guard.lock(EntityKey::Checklist(checklist_id.0)).await;

        let checklist = self
            .repo
            .get_checklist(&checklist_id)
            .await?
            .ok_or_else(not_found)?;
        let task = self.load_task(&checklist.task_id).await?;
        Ok((
            ReviewLocks {
                _task: task_lock,
                _checklist: checklist_lock,
            },
            task,
            checklist,
        ))
    }
}

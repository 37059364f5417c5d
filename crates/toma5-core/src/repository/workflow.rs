//! Workflow repository trait definition.
//!
//! Defines the storage interface for tasks, checklists with their answers,
//! and secondary verifications. Every `commit_*` method writes all of its
//! rows in one transaction: either everything is persisted or nothing is.

use chrono::NaiveDate;
use toma5_types::checklist::{Checklist, ChecklistAnswer, ChecklistId, SecondaryVerification};
use toma5_types::error::RepositoryError;
use toma5_types::task::{Task, TaskId, TaskState};
use uuid::Uuid;

use super::SortOrder;
use super::procedure::ProcedureRepository;

/// Filters for task listings. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    pub assignment_date: Option<NaiveDate>,
    pub state: Option<TaskState>,
    pub worker_id: Option<Uuid>,
    pub supervisor_id: Option<Uuid>,
    /// With `supervisor_id` set, also match tasks that have no supervisor.
    pub include_unsupervised: bool,
    pub sort_order: SortOrder,
}

/// Repository trait for workflow persistence.
///
/// Covers three entity families:
/// - **Tasks:** create (single or paired), load, filtered listing, update.
/// - **Checklists:** load by id or task, answers, atomic submission/review.
/// - **Verifications:** load and atomic upsert.
///
/// The same store serves the procedure catalog that checklists reference.
///
/// Uses native async fn in traits (Rust 2024 edition, no async_trait macro).
pub trait WorkflowRepository: ProcedureRepository + Send + Sync {
    // -----------------------------------------------------------------------
    // Tasks
    // -----------------------------------------------------------------------

    /// Insert one or more new tasks atomically (a paired assignment is two).
    fn create_tasks(
        &self,
        tasks: &[Task],
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    fn get_task(
        &self,
        id: &TaskId,
    ) -> impl std::future::Future<Output = Result<Option<Task>, RepositoryError>> + Send;

    fn list_tasks(
        &self,
        filter: &TaskFilter,
    ) -> impl std::future::Future<Output = Result<Vec<Task>, RepositoryError>> + Send;

    /// Tasks still `PENDING` whose assignment date is strictly before `day`.
    fn list_stale_pending(
        &self,
        day: NaiveDate,
    ) -> impl std::future::Future<Output = Result<Vec<Task>, RepositoryError>> + Send;

    /// Persist the mutable fields of an existing task.
    fn update_task(
        &self,
        task: &Task,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    // -----------------------------------------------------------------------
    // Checklists
    // -----------------------------------------------------------------------

    fn get_checklist(
        &self,
        id: &ChecklistId,
    ) -> impl std::future::Future<Output = Result<Option<Checklist>, RepositoryError>> + Send;

    fn get_checklist_by_task(
        &self,
        task_id: &TaskId,
    ) -> impl std::future::Future<Output = Result<Option<Checklist>, RepositoryError>> + Send;

    /// Answers of a checklist ordered by step, then submission order.
    fn get_answers(
        &self,
        checklist_id: &ChecklistId,
    ) -> impl std::future::Future<Output = Result<Vec<ChecklistAnswer>, RepositoryError>> + Send;

    /// Upsert the checklist, replace its whole answer set and update the task.
    /// Answers are kept as given, repeated steps included.
    fn commit_submission(
        &self,
        task: &Task,
        checklist: &Checklist,
        answers: &[ChecklistAnswer],
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Persist a review decision together with the resulting task state.
    fn commit_review(
        &self,
        task: &Task,
        checklist: &Checklist,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    // -----------------------------------------------------------------------
    // Secondary verifications
    // -----------------------------------------------------------------------

    fn get_verification(
        &self,
        checklist_id: &ChecklistId,
    ) -> impl std::future::Future<Output = Result<Option<SecondaryVerification>, RepositoryError>> + Send;

    /// Upsert the verification (one per checklist) and update the task.
    fn commit_verification(
        &self,
        task: &Task,
        verification: &SecondaryVerification,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;
}

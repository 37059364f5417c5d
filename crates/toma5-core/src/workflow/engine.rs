//! The task authorization workflow engine.
//!
//! Every operation follows the same order: capability check, actor profile,
//! entity lookup, ownership, state transition, payload validation, secondary
//! lookups. Mutations run under the entity guard, commit atomically through
//! the repository, release the guard, and only then enqueue notifications.

use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use toma5_types::actor::{Actor, Capability, Role, SupervisorProfile, WorkerProfile};
use toma5_types::error::WorkflowError;
use toma5_types::task::{
    CancelledBy, CreatePairedTaskRequest, CreateTaskRequest, Task, TaskId, TaskPair, TaskState,
};
use tracing::{info, warn};
use uuid::Uuid;

use super::clock::{Clock, local_day};
use super::guard::{EntityGuard, EntityKey};
use super::state::{TaskEvent, transition};
use crate::notification::{NotificationOutbox, Outgoing, catalog};
use crate::repository::blob::BlobStore;
use crate::repository::directory::DirectoryRepository;
use crate::repository::workflow::{TaskFilter, WorkflowRepository};

/// Orchestrates every workflow transition.
///
/// Generic over its ports so tests run against in-memory fakes.
pub struct WorkflowEngine<W, D, B>
where
    W: WorkflowRepository,
    D: DirectoryRepository,
    B: BlobStore,
{
    pub(crate) repo: Arc<W>,
    pub(crate) directory: Arc<D>,
    pub(crate) blobs: Arc<B>,
    pub(crate) outbox: NotificationOutbox,
    pub(crate) guard: EntityGuard,
    clock: Arc<dyn Clock>,
    timezone: FixedOffset,
}

impl<W, D, B> WorkflowEngine<W, D, B>
where
    W: WorkflowRepository,
    D: DirectoryRepository,
    B: BlobStore,
{
    pub fn new(
        repo: Arc<W>,
        directory: Arc<D>,
        blobs: Arc<B>,
        outbox: NotificationOutbox,
        clock: Arc<dyn Clock>,
        timezone: FixedOffset,
    ) -> Self {
        Self {
            repo,
            directory,
            blobs,
            outbox,
            guard: EntityGuard::new(),
            clock,
            timezone,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Current calendar day in the plant timezone.
    pub fn today(&self) -> NaiveDate {
        local_day(self.clock.now(), self.timezone)
    }

    pub fn timezone(&self) -> FixedOffset {
        self.timezone
    }

    pub fn outbox(&self) -> &NotificationOutbox {
        &self.outbox
    }

    // -----------------------------------------------------------------------
    // Task lifecycle
    // -----------------------------------------------------------------------

    /// Create a task for one worker.
    ///
    /// Supervisors assign any active worker and become the task's supervisor.
    /// Workers may only create a task for themselves; it starts unsupervised.
    pub async fn create_task(
        &self,
        actor: &Actor,
        request: CreateTaskRequest,
    ) -> Result<Task, WorkflowError> {
        authorize(actor, Capability::CreateTask)?;

        let (worker_id, supervisor_id, created_by_worker) = match actor.role {
            Role::Worker => {
                let me = self.acting_worker(actor).await?;
                if request.worker_id.is_some_and(|target| target != me.id) {
                    return Err(WorkflowError::forbidden(
                        "workers can only create tasks for themselves",
                    ));
                }
                (me.id, None, true)
            }
            _ => {
                let supervisor = self.acting_supervisor(actor).await?;
                let target = request
                    .worker_id
                    .ok_or_else(|| WorkflowError::invalid_input("worker_id is required"))?;
                (target, Some(supervisor.id), false)
            }
        };

        let description = required_text(&request.description, "description")?;
        let worker = self.assignable_worker(&worker_id).await?;

        let now = self.clock.now();
        let task = self.new_task(
            description,
            non_blank(request.location.as_deref()),
            worker.id,
            supervisor_id,
            None,
            created_by_worker,
            now,
        );
        self.repo.create_tasks(std::slice::from_ref(&task)).await?;

        info!(
            task_id = %task.id,
            worker_id = %task.worker_id,
            actor = %actor.user_id,
            role = %actor.role,
            "task created"
        );
        self.outbox
            .enqueue(vec![catalog::task_assigned(worker.user_id, &task)]);
        Ok(task)
    }

    /// Create two linked tasks sharing a group id. Both persist or neither.
    pub async fn create_paired_task(
        &self,
        actor: &Actor,
        request: CreatePairedTaskRequest,
    ) -> Result<TaskPair, WorkflowError> {
        authorize(actor, Capability::CreatePairedTask)?;

        let (supervisor_id, created_by_worker) = match actor.role {
            Role::Worker => {
                let me = self.acting_worker(actor).await?;
                if me.id != request.first_worker_id && me.id != request.second_worker_id {
                    return Err(WorkflowError::forbidden(
                        "a paired task created by a worker must include that worker",
                    ));
                }
                (None, true)
            }
            _ => (Some(self.acting_supervisor(actor).await?.id), false),
        };

        let description = required_text(&request.description, "description")?;
        if request.first_worker_id == request.second_worker_id {
            return Err(WorkflowError::invalid_input(
                "a paired task needs two different workers",
            ));
        }
        let first = self.assignable_worker(&request.first_worker_id).await?;
        let second = self.assignable_worker(&request.second_worker_id).await?;

        let now = self.clock.now();
        let group_id = Uuid::now_v7();
        let location = non_blank(request.location.as_deref());
        let tasks = [
            self.new_task(
                description.clone(),
                location.clone(),
                first.id,
                supervisor_id,
                Some(group_id),
                created_by_worker,
                now,
            ),
            self.new_task(
                description,
                location,
                second.id,
                supervisor_id,
                Some(group_id),
                created_by_worker,
                now,
            ),
        ];
        self.repo.create_tasks(&tasks).await?;

        info!(
            %group_id,
            first = %tasks[0].id,
            second = %tasks[1].id,
            actor = %actor.user_id,
            "paired task created"
        );
        self.outbox.enqueue(vec![
            catalog::task_assigned(first.user_id, &tasks[0]),
            catalog::task_assigned(second.user_id, &tasks[1]),
        ]);
        Ok(TaskPair { group_id, tasks })
    }

    /// List tasks visible to `actor`, newest first.
    ///
    /// Workers only see their own tasks. Supervisors see the tasks they
    /// supervise plus unsupervised (worker-created) tasks awaiting a reviewer.
    pub async fn list_tasks(
        &self,
        actor: &Actor,
        mut filter: TaskFilter,
    ) -> Result<Vec<Task>, WorkflowError> {
        authorize(actor, Capability::ViewTask)?;
        match actor.role {
            Role::Worker => {
                filter.worker_id = Some(self.acting_worker(actor).await?.id);
            }
            Role::Supervisor => {
                filter.supervisor_id = Some(self.acting_supervisor(actor).await?.id);
                filter.include_unsupervised = true;
            }
            Role::Administrator | Role::System => {}
        }
        Ok(self.repo.list_tasks(&filter).await?)
    }

    pub async fn get_task(&self, actor: &Actor, id: TaskId) -> Result<Task, WorkflowError> {
        authorize(actor, Capability::ViewTask)?;
        let me = self.viewing_worker(actor).await?;
        let task = self.load_task(&id).await?;
        if let Some(me) = me {
            ensure_assigned(&task, &me)?;
        }
        Ok(task)
    }

    /// Supervisor cancellation of any non-terminal task. A reason is required.
    pub async fn cancel_task(
        &self,
        actor: &Actor,
        id: TaskId,
        reason: &str,
    ) -> Result<Task, WorkflowError> {
        authorize(actor, Capability::CancelTask)?;
        self.acting_supervisor(actor).await?;

        let task = {
            let _lock = self.guard.lock(EntityKey::Task(id.0)).await;
            let mut task = self.load_task(&id).await?;
            let from = task.state;
            let to = transition(from, TaskEvent::Cancel)?;
            let reason = required_text(reason, "reason")?;

            let now = self.clock.now();
            task.state = to;
            task.cancelled_by = Some(CancelledBy::Supervisor);
            task.cancellation_reason = Some(reason);
            task.cancelled_at = Some(now);
            task.updated_at = now;
            self.repo.update_task(&task).await?;
            log_transition(&task, from, actor);
            task
        };

        if let Some(user) = self.worker_user(&task.worker_id).await {
            self.outbox.enqueue(vec![catalog::task_cancelled(user, &task)]);
        }
        Ok(task)
    }

    /// `READY_TO_START -> IN_PROGRESS` by the assigned worker.
    pub async fn start_task(&self, actor: &Actor, id: TaskId) -> Result<Task, WorkflowError> {
        authorize(actor, Capability::StartTask)?;
        self.advance_own_task(actor, id, TaskEvent::Start).await
    }

    /// `IN_PROGRESS -> COMPLETED` by the assigned worker.
    pub async fn complete_task(&self, actor: &Actor, id: TaskId) -> Result<Task, WorkflowError> {
        authorize(actor, Capability::CompleteTask)?;
        self.advance_own_task(actor, id, TaskEvent::Complete).await
    }

    async fn advance_own_task(
        &self,
        actor: &Actor,
        id: TaskId,
        event: TaskEvent,
    ) -> Result<Task, WorkflowError> {
        let me = self.acting_worker(actor).await?;
        let _lock = self.guard.lock(EntityKey::Task(id.0)).await;
        let mut task = self.load_task(&id).await?;
        ensure_assigned(&task, &me)?;
        let from = task.state;
        task.state = transition(from, event)?;
        task.updated_at = self.clock.now();
        self.repo.update_task(&task).await?;
        log_transition(&task, from, actor);
        Ok(task)
    }

    // -----------------------------------------------------------------------
    // Shared helpers
    // -----------------------------------------------------------------------

    #[allow(clippy::too_many_arguments)]
    fn new_task(
        &self,
        description: String,
        location: Option<String>,
        worker_id: Uuid,
        supervisor_id: Option<Uuid>,
        group_id: Option<Uuid>,
        created_by_worker: bool,
        now: DateTime<Utc>,
    ) -> Task {
        Task {
            id: TaskId::new(),
            description,
            location,
            assignment_date: local_day(now, self.timezone),
            state: TaskState::Pending,
            worker_id,
            supervisor_id,
            group_id,
            created_by_worker,
            cancelled_by: None,
            cancellation_reason: None,
            cancelled_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub(crate) async fn load_task(&self, id: &TaskId) -> Result<Task, WorkflowError> {
        self.repo
            .get_task(id)
            .await?
            .ok_or_else(|| WorkflowError::not_found(format!("task {id}")))
    }

    /// Worker profile of the calling worker.
    pub(crate) async fn acting_worker(&self, actor: &Actor) -> Result<WorkerProfile, WorkflowError> {
        match self.directory.find_worker_by_user(&actor.user_id).await? {
            Some(worker) if worker.active => Ok(worker),
            Some(_) => Err(WorkflowError::forbidden("worker profile is inactive")),
            None => Err(WorkflowError::forbidden(
                "no worker profile is linked to this account",
            )),
        }
    }

    /// Supervisor profile of the calling supervisor.
    pub(crate) async fn acting_supervisor(
        &self,
        actor: &Actor,
    ) -> Result<SupervisorProfile, WorkflowError> {
        match self.directory.find_supervisor_by_user(&actor.user_id).await? {
            Some(supervisor) if supervisor.active => Ok(supervisor),
            Some(_) => Err(WorkflowError::forbidden("supervisor profile is inactive")),
            None => Err(WorkflowError::forbidden(
                "no supervisor profile is linked to this account",
            )),
        }
    }

    /// The caller's worker profile when read access must be scoped to it.
    pub(crate) async fn viewing_worker(
        &self,
        actor: &Actor,
    ) -> Result<Option<WorkerProfile>, WorkflowError> {
        if actor.role == Role::Worker {
            Ok(Some(self.acting_worker(actor).await?))
        } else {
            Ok(None)
        }
    }

    async fn assignable_worker(&self, worker_id: &Uuid) -> Result<WorkerProfile, WorkflowError> {
        let worker = self
            .directory
            .get_worker(worker_id)
            .await?
            .ok_or_else(|| WorkflowError::not_found(format!("worker {worker_id}")))?;
        if !worker.active {
            return Err(WorkflowError::invalid_input(format!(
                "worker {} is inactive and cannot be assigned",
                worker.full_name
            )));
        }
        Ok(worker)
    }

    /// User account of a worker profile, for addressing notifications.
    pub(crate) async fn worker_user(&self, worker_id: &Uuid) -> Option<Uuid> {
        match self.directory.get_worker(worker_id).await {
            Ok(Some(worker)) => Some(worker.user_id),
            Ok(None) => {
                warn!(%worker_id, "worker profile missing, notification skipped");
                None
            }
            Err(e) => {
                warn!(%worker_id, error = %e, "worker lookup failed, notification skipped");
                None
            }
        }
    }

    /// Users to notify about a task awaiting supervisor attention: its
    /// supervisor, or every active supervisor when it has none yet.
    pub(crate) async fn supervisor_users(&self, supervisor_id: Option<Uuid>) -> Vec<Uuid> {
        let result = match supervisor_id {
            Some(id) => self
                .directory
                .get_supervisor(&id)
                .await
                .map(|s| s.into_iter().collect::<Vec<_>>()),
            None => self.directory.list_active_supervisors().await,
        };
        match result {
            Ok(supervisors) => supervisors.into_iter().map(|s| s.user_id).collect(),
            Err(e) => {
                warn!(error = %e, "supervisor lookup failed, notification skipped");
                Vec::new()
            }
        }
    }

    pub(crate) fn enqueue(&self, batch: Vec<Outgoing>) {
        self.outbox.enqueue(batch);
    }
}

pub(crate) fn authorize(actor: &Actor, capability: Capability) -> Result<(), WorkflowError> {
    if actor.can(capability) {
        Ok(())
    } else {
        Err(WorkflowError::forbidden(format!(
            "role {} may not {capability}",
            actor.role
        )))
    }
}

pub(crate) fn ensure_assigned(task: &Task, worker: &WorkerProfile) -> Result<(), WorkflowError> {
    if task.worker_id == worker.id {
        Ok(())
    } else {
        Err(WorkflowError::forbidden("task is not assigned to you"))
    }
}

pub(crate) fn log_transition(task: &Task, from: TaskState, actor: &Actor) {
    info!(
        task_id = %task.id,
        %from,
        to = %task.state,
        actor = %actor.user_id,
        role = %actor.role,
        "task transition committed"
    );
}

/// Trimmed, non-empty text or `InvalidInput`.
pub(crate) fn required_text(value: &str, field: &str) -> Result<String, WorkflowError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(WorkflowError::invalid_input(format!("{field} is required")))
    } else {
        Ok(trimmed.to_string())
    }
}

/// Trimmed text; blank becomes absent.
pub(crate) fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

//! Worker directory and procedure catalog reads, plus the supervisor's
//! daily availability toggle.

use toma5_types::actor::{Actor, Capability, WorkerProfile};
use toma5_types::error::WorkflowError;
use toma5_types::procedure::Procedure;
use tracing::info;
use uuid::Uuid;

use super::engine::{WorkflowEngine, authorize};
use super::guard::EntityKey;
use crate::notification::catalog;
use crate::repository::blob::BlobStore;
use crate::repository::directory::{DirectoryRepository, WorkerFilter};
use crate::repository::procedure::ProcedureRepository;
use crate::repository::workflow::WorkflowRepository;

impl<W, D, B> WorkflowEngine<W, D, B>
where
    W: WorkflowRepository,
    D: DirectoryRepository,
    B: BlobStore,
{
    /// Workers matching `filter`, by shift then name.
    pub async fn list_workers(
        &self,
        actor: &Actor,
        filter: WorkerFilter,
    ) -> Result<Vec<WorkerProfile>, WorkflowError> {
        authorize(actor, Capability::ViewWorkers)?;
        let filter = WorkerFilter {
            shift: filter.normalized_shift(),
            available: filter.available,
        };
        Ok(self.directory.list_workers(&filter).await?)
    }

    pub async fn get_worker(
        &self,
        actor: &Actor,
        worker_id: Uuid,
    ) -> Result<WorkerProfile, WorkflowError> {
        authorize(actor, Capability::ViewTask)?;
        self.directory
            .get_worker(&worker_id)
            .await?
            .ok_or_else(|| WorkflowError::not_found(format!("worker {worker_id}")))
    }

    /// Mark a worker available or not for today. Going from available to
    /// unavailable notifies the worker; every other change is silent.
    pub async fn set_worker_availability(
        &self,
        actor: &Actor,
        worker_id: Uuid,
        available: bool,
    ) -> Result<WorkerProfile, WorkflowError> {
        authorize(actor, Capability::SetWorkerAvailability)?;
        self.acting_supervisor(actor).await?;

        let (before, after) = {
            let _lock = self.guard.lock(EntityKey::Worker(worker_id)).await;
            let before = self
                .directory
                .get_worker(&worker_id)
                .await?
                .ok_or_else(|| WorkflowError::not_found(format!("worker {worker_id}")))?;
            if !before.active {
                return Err(WorkflowError::invalid_input(format!(
                    "worker {} is inactive",
                    before.full_name
                )));
            }
            let after = self
                .directory
                .set_worker_availability(&worker_id, available)
                .await?;
            (before, after)
        };

        info!(
            %worker_id,
            from = before.available,
            to = after.available,
            actor = %actor.user_id,
            "worker availability updated"
        );
        if before.available && !after.available {
            self.enqueue(vec![catalog::worker_unavailable(&after)]);
        }
        Ok(after)
    }

    /// The procedure catalog, by name.
    pub async fn list_procedures(
        &self,
        actor: &Actor,
        active_only: bool,
    ) -> Result<Vec<Procedure>, WorkflowError> {
        authorize(actor, Capability::ViewTask)?;
        Ok(self.repo.list_procedures(active_only).await?)
    }

    pub async fn get_procedure(&self, actor: &Actor, id: Uuid) -> Result<Procedure, WorkflowError> {
        authorize(actor, Capability::ViewTask)?;
        self.repo
            .get_procedure(&id)
            .await?
            .ok_or_else(|| WorkflowError::not_found(format!("procedure {id}")))
    }

    /// An active procedure a submission may reference.
    pub(crate) async fn attachable_procedure(&self, id: &Uuid) -> Result<Procedure, WorkflowError> {
        let procedure = self
            .repo
            .get_procedure(id)
            .await?
            .ok_or_else(|| WorkflowError::invalid_input(format!("unknown procedure {id}")))?;
        if !procedure.active {
            return Err(WorkflowError::invalid_input(format!(
                "procedure {} is no longer active",
                procedure.name
            )));
        }
        Ok(procedure)
    }
}

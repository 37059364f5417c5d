//! Secondary verification ("ASST") upload.

use toma5_types::actor::{Actor, Capability};
use toma5_types::checklist::{ReviewStatus, SecondaryVerification};
use toma5_types::error::WorkflowError;
use toma5_types::task::TaskId;
use tracing::warn;
use uuid::Uuid;

use super::engine::{WorkflowEngine, authorize, ensure_assigned, log_transition};
use super::guard::EntityKey;
use super::state::{TaskEvent, transition};
use crate::notification::catalog;
use crate::repository::blob::BlobStore;
use crate::repository::directory::DirectoryRepository;
use crate::repository::workflow::WorkflowRepository;

impl<W, D, B> WorkflowEngine<W, D, B>
where
    W: WorkflowRepository,
    D: DirectoryRepository,
    B: BlobStore,
{
    /// Upload the two evidence images for an approved checklist that requires
    /// them. The task becomes `READY_TO_START`; a repeated upload replaces
    /// the stored references instead of adding a second record.
    pub async fn submit_secondary_verification(
        &self,
        actor: &Actor,
        task_id: TaskId,
        image1: &str,
        image2: &str,
    ) -> Result<SecondaryVerification, WorkflowError> {
        authorize(actor, Capability::SubmitSecondaryVerification)?;
        let me = self.acting_worker(actor).await?;

        let (task, verification) = {
            let _task_lock = self.guard.lock(EntityKey::Task(task_id.0)).await;
            let mut task = self.load_task(&task_id).await?;
            ensure_assigned(&task, &me)?;

            let checklist = self
                .repo
                .get_checklist_by_task(&task_id)
                .await?
                .ok_or_else(|| WorkflowError::invalid_state("task has no submitted checklist"))?;
            if !checklist.requires_secondary_verification {
                return Err(WorkflowError::invalid_state(
                    "checklist does not require secondary verification",
                ));
            }
            if checklist.review_status() != ReviewStatus::Approved {
                return Err(WorkflowError::invalid_state("checklist is not yet approved"));
            }
            let from = task.state;
            let to = transition(from, TaskEvent::SubmitVerification)?;
            if image1.trim().is_empty() || image2.trim().is_empty() {
                return Err(WorkflowError::invalid_input("two images are required"));
            }

            let _checklist_lock = self.guard.lock(EntityKey::Checklist(checklist.id.0)).await;
            let existing = self.repo.get_verification(&checklist.id).await?;
            let image1_url = self.blobs.store_image(image1.trim()).await?;
            let image2_url = match self.blobs.store_image(image2.trim()).await {
                Ok(url) => url,
                Err(e) => {
                    self.discard_images(&[&image1_url]).await;
                    return Err(e.into());
                }
            };

            let now = self.now();
            let verification = SecondaryVerification {
                id: existing.as_ref().map(|v| v.id).unwrap_or_else(Uuid::now_v7),
                checklist_id: checklist.id,
                image1_url,
                image2_url,
                uploaded_at: now,
            };
            task.state = to;
            task.updated_at = now;

            if let Err(e) = self.repo.commit_verification(&task, &verification).await {
                self.discard_images(&[&verification.image1_url, &verification.image2_url])
                    .await;
                return Err(e.into());
            }
            log_transition(&task, from, actor);
            if let Some(previous) = existing {
                self.discard_images(&[&previous.image1_url, &previous.image2_url])
                    .await;
            }
            (task, verification)
        };

        let notes = self
            .supervisor_users(task.supervisor_id)
            .await
            .into_iter()
            .map(|user| catalog::verification_submitted(user, &task, &verification))
            .collect();
        self.enqueue(notes);
        Ok(verification)
    }

    /// Best-effort removal of stored images no verification record points at.
    async fn discard_images(&self, urls: &[&str]) {
        for url in urls {
            if let Err(e) = self.blobs.delete_image(url).await {
                warn!(%url, error = %e, "orphaned evidence image left behind");
            }
        }
    }

    /// The verification of a task's checklist. `NotFound` when the task has no
    /// checklist or no verification yet.
    pub async fn get_secondary_verification_by_task(
        &self,
        actor: &Actor,
        task_id: TaskId,
    ) -> Result<SecondaryVerification, WorkflowError> {
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
        self.repo
            .get_verification(&checklist.id)
            .await?
            .ok_or_else(|| {
                WorkflowError::not_found(format!("secondary verification for task {task_id}"))
            })
    }
}

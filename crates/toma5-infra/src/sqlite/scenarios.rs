//! The workflow engine driven end to end through the SQLite repositories,
//! the SQLite directory and the filesystem blob store.

use std::sync::Arc;

use chrono::FixedOffset;
use tempfile::TempDir;
use toma5_core::notification::{NotificationDispatcher, NotificationOutbox, spawn_delivery_worker};
use toma5_core::repository::notification::{NotificationQuery, NotificationRepository};
use toma5_core::workflow::{Clock, SystemClock, WorkflowEngine};
use toma5_types::actor::{Actor, Role};
use toma5_types::checklist::{ChecklistAnswer, ChecklistDetail, ChecklistSubmission};
use toma5_types::error::{ErrorKind, WorkflowError};
use toma5_types::notification::NotificationKind;
use toma5_types::task::{CreateTaskRequest, Task, TaskState};
use uuid::Uuid;

use super::directory::SqliteDirectory;
use super::fixtures::{Seeded, insert_procedure, seeded_pool};
use super::notification::SqliteNotificationRepository;
use super::workflow::SqliteWorkflowRepository;
use crate::blob::LocalBlobStore;

const PNG: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAAB";

type Engine = WorkflowEngine<SqliteWorkflowRepository, SqliteDirectory, LocalBlobStore>;

struct Plant {
    dir: TempDir,
    seeded: Seeded,
    engine: Engine,
    outbox: NotificationOutbox,
    notifications: Arc<SqliteNotificationRepository>,
}

impl Plant {
    async fn open() -> Self {
        let (dir, seeded) = seeded_pool().await;
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let notifications = Arc::new(SqliteNotificationRepository::new(seeded.pool.clone()));
        let dispatcher = Arc::new(NotificationDispatcher::new(
            notifications.clone(),
            8,
            clock.clone(),
        ));
        let (outbox, _worker) = spawn_delivery_worker(dispatcher);
        let engine = WorkflowEngine::new(
            Arc::new(SqliteWorkflowRepository::new(seeded.pool.clone())),
            Arc::new(SqliteDirectory::new(seeded.pool.clone())),
            Arc::new(LocalBlobStore::new(dir.path().join("blobs"), "/media")),
            outbox.clone(),
            clock,
            FixedOffset::west_opt(5 * 3600).unwrap(),
        );
        Self {
            dir,
            seeded,
            engine,
            outbox,
            notifications,
        }
    }

    fn worker(&self) -> Actor {
        Actor::new(self.seeded.worker.user_id, Role::Worker)
    }

    fn supervisor(&self) -> Actor {
        Actor::new(self.seeded.supervisor.user_id, Role::Supervisor)
    }

    async fn assign(&self) -> Task {
        self.engine
            .create_task(
                &self.supervisor(),
                CreateTaskRequest {
                    description: "Replace pump seal".to_string(),
                    location: Some("Pump house".to_string()),
                    worker_id: Some(self.seeded.worker.id),
                },
            )
            .await
            .unwrap()
    }

    async fn submit(
        &self,
        task: &Task,
        pairs: &[(u8, bool)],
        procedure_id: Option<Uuid>,
    ) -> Result<ChecklistDetail, WorkflowError> {
        let submission = ChecklistSubmission {
            task_id: task.id,
            answers: pairs
                .iter()
                .map(|(step, answer)| ChecklistAnswer::new(*step, format!("Step {step}?"), *answer))
                .collect(),
            procedure_id,
            additional_hazards: None,
            comments: None,
        };
        self.engine.submit_checklist(&self.worker(), submission).await
    }
}

#[tokio::test]
async fn test_repeated_step_submission_commits() {
    let plant = Plant::open().await;
    let task = plant.assign().await;

    let detail = plant.submit(&task, &[(3, true), (3, false)], None).await.unwrap();
    assert!(detail.checklist.requires_secondary_verification);

    let stored = plant
        .engine
        .get_checklist(&plant.supervisor(), detail.checklist.id)
        .await
        .unwrap();
    let pairs: Vec<(u8, bool)> = stored.answers.iter().map(|a| (a.step, a.answer)).collect();
    assert_eq!(pairs, vec![(3, true), (3, false)]);
    assert_eq!(
        plant.engine.get_task(&plant.worker(), task.id).await.unwrap().state,
        TaskState::ChecklistSubmitted
    );
}

#[tokio::test]
async fn test_procedure_reference_is_validated_before_commit() {
    let plant = Plant::open().await;
    let task = plant.assign().await;
    let retired = insert_procedure(&plant.seeded.pool, "Old Method", false).await;
    let current = insert_procedure(&plant.seeded.pool, "Lockout Tagout", true).await;

    let err = plant
        .submit(&task, &[(1, true)], Some(Uuid::now_v7()))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    let err = plant
        .submit(&task, &[(1, true)], Some(retired.id))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);

    let detail = plant
        .submit(&task, &[(1, true)], Some(current.id))
        .await
        .unwrap();
    let fetched = plant
        .engine
        .get_checklist_by_task(&plant.worker(), task.id)
        .await
        .unwrap();
    assert_eq!(fetched.checklist.id, detail.checklist.id);
    assert_eq!(fetched.procedure, Some(current));
}

#[tokio::test]
async fn test_verification_upload_rejects_garbage_then_stores_evidence() {
    let plant = Plant::open().await;
    let task = plant.assign().await;
    let detail = plant.submit(&task, &[(2, false)], None).await.unwrap();
    plant
        .engine
        .approve_checklist(&plant.supervisor(), detail.checklist.id)
        .await
        .unwrap();

    let err = plant
        .engine
        .submit_secondary_verification(&plant.worker(), task.id, PNG, "data:image/png;base64,@@@")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    // The first image of the failed upload was cleaned up.
    let folder = plant.dir.path().join("blobs").join("secondary-verification");
    assert_eq!(std::fs::read_dir(&folder).unwrap().count(), 0);

    let verification = plant
        .engine
        .submit_secondary_verification(&plant.worker(), task.id, PNG, PNG)
        .await
        .unwrap();
    assert!(verification.image1_url.starts_with("/media/secondary-verification/"));
    assert_eq!(std::fs::read_dir(&folder).unwrap().count(), 2);
    assert_eq!(
        plant.engine.get_task(&plant.worker(), task.id).await.unwrap().state,
        TaskState::ReadyToStart
    );
}

#[tokio::test]
async fn test_availability_change_is_persisted_and_announced() {
    let plant = Plant::open().await;
    let worker_id = plant.seeded.worker.id;

    let updated = plant
        .engine
        .set_worker_availability(&plant.supervisor(), worker_id, false)
        .await
        .unwrap();
    assert!(!updated.available);
    assert!(
        !plant
            .engine
            .get_worker(&plant.supervisor(), worker_id)
            .await
            .unwrap()
            .available
    );

    plant.outbox.flush().await;
    let (inbox, _) = plant
        .notifications
        .list(&plant.seeded.worker.user_id, &NotificationQuery::default())
        .await
        .unwrap();
    assert_eq!(
        inbox.iter().map(|n| n.kind).collect::<Vec<_>>(),
        vec![NotificationKind::WorkerUnavailable]
    );
}

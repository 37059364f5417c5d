//! In-memory implementations of the ports, used by the engine tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use chrono::{DateTime, NaiveDate, Utc};
use toma5_types::actor::{SupervisorProfile, WorkerProfile};
use toma5_types::checklist::{
    CHECKLIST_STEPS, Checklist, ChecklistAnswer, ChecklistId, SecondaryVerification,
};
use toma5_types::error::{BlobError, RepositoryError};
use toma5_types::notification::{Notification, NotificationId};
use toma5_types::procedure::Procedure;
use toma5_types::task::{Task, TaskId, TaskState};
use uuid::Uuid;

use crate::repository::SortOrder;
use crate::repository::blob::BlobStore;
use crate::repository::directory::{DirectoryRepository, WorkerFilter};
use crate::repository::notification::{NotificationQuery, NotificationRepository};
use crate::repository::procedure::ProcedureRepository;
use crate::repository::workflow::{TaskFilter, WorkflowRepository};

// ---------------------------------------------------------------------------
// Workflow
// ---------------------------------------------------------------------------

#[derive(Default)]
struct WorkflowTables {
    tasks: HashMap<TaskId, Task>,
    checklists: HashMap<ChecklistId, Checklist>,
    answers: HashMap<ChecklistId, Vec<ChecklistAnswer>>,
    verifications: HashMap<ChecklistId, SecondaryVerification>,
    procedures: HashMap<Uuid, Procedure>,
}

/// The constraints the SQL schema enforces on a submission.
fn check_submission(
    tables: &WorkflowTables,
    task: &Task,
    checklist: &Checklist,
    answers: &[ChecklistAnswer],
) -> Result<(), RepositoryError> {
    if !tables.tasks.contains_key(&task.id) || checklist.task_id != task.id {
        return Err(RepositoryError::Conflict("checklist task does not exist".to_string()));
    }
    if tables
        .checklists
        .values()
        .any(|c| c.task_id == checklist.task_id && c.id != checklist.id)
    {
        return Err(RepositoryError::Conflict(format!(
            "task {} already has a checklist",
            checklist.task_id
        )));
    }
    if let Some(id) = &checklist.procedure_id {
        if !tables.procedures.contains_key(id) {
            return Err(RepositoryError::Conflict(format!("procedure {id} does not exist")));
        }
    }
    if let Some(bad) = answers.iter().find(|a| a.step == 0 || a.step > CHECKLIST_STEPS) {
        return Err(RepositoryError::Query(format!(
            "CHECK constraint failed: step {}",
            bad.step
        )));
    }
    Ok(())
}

#[derive(Default)]
pub struct InMemoryWorkflow {
    tables: Mutex<WorkflowTables>,
    failing_tasks: Mutex<HashSet<TaskId>>,
    pub commits: AtomicUsize,
}

impl InMemoryWorkflow {
    /// Make every write touching `task_id` fail with a query error.
    pub fn fail_writes_for(&self, task_id: TaskId) {
        self.failing_tasks.lock().unwrap().insert(task_id);
    }

    pub fn insert_task(&self, task: Task) {
        self.tables.lock().unwrap().tasks.insert(task.id, task);
    }

    pub fn task(&self, id: &TaskId) -> Option<Task> {
        self.tables.lock().unwrap().tasks.get(id).cloned()
    }

    pub fn answers_for(&self, id: &ChecklistId) -> Vec<ChecklistAnswer> {
        self.tables
            .lock()
            .unwrap()
            .answers
            .get(id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn verification_count(&self) -> usize {
        self.tables.lock().unwrap().verifications.len()
    }

    pub fn add_procedure(&self, name: &str, active: bool) -> Procedure {
        let procedure = Procedure {
            id: Uuid::now_v7(),
            name: name.to_string(),
            description: None,
            document_url: Some(format!("/docs/{}.pdf", name.to_lowercase().replace(' ', "-"))),
            active,
            created_at: Utc::now(),
        };
        self.tables
            .lock()
            .unwrap()
            .procedures
            .insert(procedure.id, procedure.clone());
        procedure
    }

    fn check_writable(&self, id: &TaskId) -> Result<(), RepositoryError> {
        if self.failing_tasks.lock().unwrap().contains(id) {
            return Err(RepositoryError::Query(format!("injected failure for {id}")));
        }
        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl WorkflowRepository for InMemoryWorkflow {
    async fn create_tasks(&self, tasks: &[Task]) -> Result<(), RepositoryError> {
        for task in tasks {
            self.check_writable(&task.id)?;
        }
        let mut tables = self.tables.lock().unwrap();
        if let Some(dup) = tasks.iter().find(|t| tables.tasks.contains_key(&t.id)) {
            return Err(RepositoryError::Conflict(format!("task {} already exists", dup.id)));
        }
        for task in tasks {
            tables.tasks.insert(task.id, task.clone());
        }
        Ok(())
    }

    async fn get_task(&self, id: &TaskId) -> Result<Option<Task>, RepositoryError> {
        Ok(self.task(id))
    }

    async fn list_tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>, RepositoryError> {
        let tables = self.tables.lock().unwrap();
        let mut tasks: Vec<Task> = tables
            .tasks
            .values()
            .filter(|t| filter.assignment_date.is_none_or(|d| t.assignment_date == d))
            .filter(|t| filter.state.is_none_or(|s| t.state == s))
            .filter(|t| filter.worker_id.is_none_or(|w| t.worker_id == w))
            .filter(|t| {
                filter.supervisor_id.is_none_or(|s| {
                    t.supervisor_id == Some(s)
                        || (filter.include_unsupervised && t.supervisor_id.is_none())
                })
            })
            .cloned()
            .collect();
        tasks.sort_by_key(|t| (t.created_at, t.id.0));
        if filter.sort_order == SortOrder::Desc {
            tasks.reverse();
        }
        Ok(tasks)
    }

    async fn list_stale_pending(&self, day: NaiveDate) -> Result<Vec<Task>, RepositoryError> {
        let tables = self.tables.lock().unwrap();
        let mut tasks: Vec<Task> = tables
            .tasks
            .values()
            .filter(|t| t.state == TaskState::Pending && t.assignment_date < day)
            .cloned()
            .collect();
        tasks.sort_by_key(|t| (t.assignment_date, t.id.0));
        Ok(tasks)
    }

    async fn update_task(&self, task: &Task) -> Result<(), RepositoryError> {
        self.check_writable(&task.id)?;
        let mut tables = self.tables.lock().unwrap();
        if !tables.tasks.contains_key(&task.id) {
            return Err(RepositoryError::NotFound);
        }
        tables.tasks.insert(task.id, task.clone());
        Ok(())
    }

    async fn get_checklist(&self, id: &ChecklistId) -> Result<Option<Checklist>, RepositoryError> {
        Ok(self.tables.lock().unwrap().checklists.get(id).cloned())
    }

    async fn get_checklist_by_task(
        &self,
        task_id: &TaskId,
    ) -> Result<Option<Checklist>, RepositoryError> {
        Ok(self
            .tables
            .lock()
            .unwrap()
            .checklists
            .values()
            .find(|c| c.task_id == *task_id)
            .cloned())
    }

    async fn get_answers(
        &self,
        checklist_id: &ChecklistId,
    ) -> Result<Vec<ChecklistAnswer>, RepositoryError> {
        // Stable, like ORDER BY step, ordinal.
        let mut answers = self.answers_for(checklist_id);
        answers.sort_by_key(|a| a.step);
        Ok(answers)
    }

    async fn commit_submission(
        &self,
        task: &Task,
        checklist: &Checklist,
        answers: &[ChecklistAnswer],
    ) -> Result<(), RepositoryError> {
        self.check_writable(&task.id)?;
        let mut tables = self.tables.lock().unwrap();
        check_submission(&tables, task, checklist, answers)?;
        tables.tasks.insert(task.id, task.clone());
        tables.checklists.insert(checklist.id, checklist.clone());
        tables.answers.insert(checklist.id, answers.to_vec());
        Ok(())
    }

    async fn commit_review(&self, task: &Task, checklist: &Checklist) -> Result<(), RepositoryError> {
        self.check_writable(&task.id)?;
        let mut tables = self.tables.lock().unwrap();
        tables.tasks.insert(task.id, task.clone());
        tables.checklists.insert(checklist.id, checklist.clone());
        Ok(())
    }

    async fn get_verification(
        &self,
        checklist_id: &ChecklistId,
    ) -> Result<Option<SecondaryVerification>, RepositoryError> {
        Ok(self
            .tables
            .lock()
            .unwrap()
            .verifications
            .get(checklist_id)
            .cloned())
    }

    async fn commit_verification(
        &self,
        task: &Task,
        verification: &SecondaryVerification,
    ) -> Result<(), RepositoryError> {
        self.check_writable(&task.id)?;
        let mut tables = self.tables.lock().unwrap();
        if !tables.checklists.contains_key(&verification.checklist_id) {
            return Err(RepositoryError::Conflict(format!(
                "checklist {} does not exist",
                verification.checklist_id
            )));
        }
        tables.tasks.insert(task.id, task.clone());
        tables
            .verifications
            .insert(verification.checklist_id, verification.clone());
        Ok(())
    }
}

impl ProcedureRepository for InMemoryWorkflow {
    async fn list_procedures(&self, active_only: bool) -> Result<Vec<Procedure>, RepositoryError> {
        let tables = self.tables.lock().unwrap();
        let mut procedures: Vec<Procedure> = tables
            .procedures
            .values()
            .filter(|p| !active_only || p.active)
            .cloned()
            .collect();
        procedures.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(procedures)
    }

    async fn get_procedure(&self, id: &Uuid) -> Result<Option<Procedure>, RepositoryError> {
        Ok(self.tables.lock().unwrap().procedures.get(id).cloned())
    }
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct InMemoryNotifications {
    rows: Mutex<Vec<Notification>>,
    fail_saves: AtomicBool,
}

impl InMemoryNotifications {
    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    /// Every notification addressed to `recipient`, oldest first.
    pub fn for_recipient(&self, recipient: &Uuid) -> Vec<Notification> {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .filter(|n| n.recipient_id == *recipient)
            .cloned()
            .collect()
    }
}

impl NotificationRepository for InMemoryNotifications {
    async fn save(&self, notification: &Notification) -> Result<(), RepositoryError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(RepositoryError::Connection);
        }
        self.rows.lock().unwrap().push(notification.clone());
        Ok(())
    }

    async fn get(&self, id: &NotificationId) -> Result<Option<Notification>, RepositoryError> {
        Ok(self.rows.lock().unwrap().iter().find(|n| n.id == *id).cloned())
    }

    async fn mark_read(
        &self,
        id: &NotificationId,
        at: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        let mut rows = self.rows.lock().unwrap();
        match rows.iter_mut().find(|n| n.id == *id && !n.read) {
            Some(n) => {
                n.read = true;
                n.read_at = Some(at);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn mark_all_read(
        &self,
        recipient_id: &Uuid,
        at: DateTime<Utc>,
    ) -> Result<u64, RepositoryError> {
        let mut rows = self.rows.lock().unwrap();
        let mut count = 0;
        for n in rows
            .iter_mut()
            .filter(|n| n.recipient_id == *recipient_id && !n.read)
        {
            n.read = true;
            n.read_at = Some(at);
            count += 1;
        }
        Ok(count)
    }

    async fn list(
        &self,
        recipient_id: &Uuid,
        query: &NotificationQuery,
    ) -> Result<(Vec<Notification>, u64), RepositoryError> {
        let rows = self.rows.lock().unwrap();
        let mut matching: Vec<Notification> = rows
            .iter()
            .filter(|n| n.recipient_id == *recipient_id && (!query.only_unread || !n.read))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.0.cmp(&a.id.0)));
        let total = matching.len() as u64;
        let page = matching
            .into_iter()
            .skip(query.offset() as usize)
            .take(query.limit as usize)
            .collect();
        Ok((page, total))
    }

    async fn count_unread(&self, recipient_id: &Uuid) -> Result<u64, RepositoryError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|n| n.recipient_id == *recipient_id && !n.read)
            .count() as u64)
    }

    async fn purge_read_before(&self, cutoff: DateTime<Utc>) -> Result<u64, RepositoryError> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|n| !(n.read && n.read_at.is_some_and(|at| at < cutoff)));
        Ok((before - rows.len()) as u64)
    }
}

// ---------------------------------------------------------------------------
// Directory
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct InMemoryDirectory {
    workers: Mutex<Vec<WorkerProfile>>,
    supervisors: Mutex<Vec<SupervisorProfile>>,
}

impl InMemoryDirectory {
    pub fn add_worker(&self, name: &str) -> WorkerProfile {
        self.add_worker_on_shift(name, None)
    }

    pub fn add_worker_on_shift(&self, name: &str, shift: Option<&str>) -> WorkerProfile {
        let profile = WorkerProfile {
            id: Uuid::now_v7(),
            user_id: Uuid::now_v7(),
            full_name: name.to_string(),
            active: true,
            shift: shift.map(str::to_uppercase),
            available: true,
        };
        self.workers.lock().unwrap().push(profile.clone());
        profile
    }

    pub fn add_supervisor(&self, name: &str) -> SupervisorProfile {
        let profile = SupervisorProfile {
            id: Uuid::now_v7(),
            user_id: Uuid::now_v7(),
            full_name: name.to_string(),
            active: true,
        };
        self.supervisors.lock().unwrap().push(profile.clone());
        profile
    }

    pub fn deactivate_worker(&self, worker_id: &Uuid) {
        if let Some(w) = self
            .workers
            .lock()
            .unwrap()
            .iter_mut()
            .find(|w| w.id == *worker_id)
        {
            w.active = false;
        }
    }
}

impl DirectoryRepository for InMemoryDirectory {
    async fn find_worker_by_user(
        &self,
        user_id: &Uuid,
    ) -> Result<Option<WorkerProfile>, RepositoryError> {
        Ok(self
            .workers
            .lock()
            .unwrap()
            .iter()
            .find(|w| w.user_id == *user_id)
            .cloned())
    }

    async fn find_supervisor_by_user(
        &self,
        user_id: &Uuid,
    ) -> Result<Option<SupervisorProfile>, RepositoryError> {
        Ok(self
            .supervisors
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.user_id == *user_id)
            .cloned())
    }

    async fn get_worker(&self, worker_id: &Uuid) -> Result<Option<WorkerProfile>, RepositoryError> {
        Ok(self
            .workers
            .lock()
            .unwrap()
            .iter()
            .find(|w| w.id == *worker_id)
            .cloned())
    }

    async fn get_supervisor(
        &self,
        supervisor_id: &Uuid,
    ) -> Result<Option<SupervisorProfile>, RepositoryError> {
        Ok(self
            .supervisors
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.id == *supervisor_id)
            .cloned())
    }

    async fn list_active_supervisors(&self) -> Result<Vec<SupervisorProfile>, RepositoryError> {
        Ok(self
            .supervisors
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.active)
            .cloned()
            .collect())
    }

    async fn list_workers(&self, filter: &WorkerFilter) -> Result<Vec<WorkerProfile>, RepositoryError> {
        let shift = filter.normalized_shift();
        let mut workers: Vec<WorkerProfile> = self
            .workers
            .lock()
            .unwrap()
            .iter()
            .filter(|w| shift.is_none() || w.shift == shift)
            .filter(|w| filter.available.is_none_or(|a| w.available == a))
            .cloned()
            .collect();
        workers.sort_by(|a, b| a.shift.cmp(&b.shift).then(a.full_name.cmp(&b.full_name)));
        Ok(workers)
    }

    async fn set_worker_availability(
        &self,
        worker_id: &Uuid,
        available: bool,
    ) -> Result<WorkerProfile, RepositoryError> {
        let mut workers = self.workers.lock().unwrap();
        let worker = workers
            .iter_mut()
            .find(|w| w.id == *worker_id)
            .ok_or(RepositoryError::NotFound)?;
        worker.available = available;
        Ok(worker.clone())
    }
}

// ---------------------------------------------------------------------------
// Blobs
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct InMemoryBlobs {
    live: Mutex<Vec<String>>,
    next: AtomicUsize,
    /// Uploads still allowed before the store starts failing.
    budget: Mutex<Option<usize>>,
}

impl InMemoryBlobs {
    pub fn fail_uploads(&self, fail: bool) {
        *self.budget.lock().unwrap() = fail.then_some(0);
    }

    /// Let `n` more uploads succeed, then fail every one after.
    pub fn fail_uploads_after(&self, n: usize) {
        *self.budget.lock().unwrap() = Some(n);
    }

    /// Images currently held by the store.
    pub fn stored(&self) -> usize {
        self.live.lock().unwrap().len()
    }

    pub fn contains(&self, url: &str) -> bool {
        self.live.lock().unwrap().iter().any(|u| u == url)
    }
}

impl BlobStore for InMemoryBlobs {
    async fn store_image(&self, raw: &str) -> Result<String, BlobError> {
        if !raw.starts_with("data:image/") {
            return Err(BlobError::InvalidImage("expected a data:image URL".to_string()));
        }
        {
            let mut budget = self.budget.lock().unwrap();
            match budget.as_mut() {
                Some(0) => return Err(BlobError::UploadFailed("blob store offline".to_string())),
                Some(left) => *left -= 1,
                None => {}
            }
        }
        let n = self.next.fetch_add(1, Ordering::SeqCst) + 1;
        let url = format!("/media/secondary-verification/{n}.png");
        self.live.lock().unwrap().push(url.clone());
        Ok(url)
    }

    async fn delete_image(&self, url: &str) -> Result<(), BlobError> {
        self.live.lock().unwrap().retain(|u| u != url);
        Ok(())
    }
}

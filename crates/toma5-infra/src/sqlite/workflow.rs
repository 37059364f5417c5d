//! SQLite workflow repository implementation.
//!
//! Implements `WorkflowRepository` and `ProcedureRepository` from `toma5-core`
//! using sqlx with split read/write pools. Every multi-row commit runs in one
//! writer transaction.

use toma5_core::repository::SortOrder;
use toma5_core::repository::procedure::ProcedureRepository;
use toma5_core::repository::workflow::{TaskFilter, WorkflowRepository};
use toma5_types::checklist::{Checklist, ChecklistAnswer, ChecklistId, SecondaryVerification};
use toma5_types::error::RepositoryError;
use toma5_types::procedure::Procedure;
use toma5_types::task::{CancelledBy, Task, TaskId, TaskState};
use chrono::NaiveDate;
use sqlx::{QueryBuilder, Row, Sqlite, SqliteConnection};
use uuid::Uuid;

use super::pool::DatabasePool;
use super::{format_datetime, format_day, parse_datetime, parse_day, parse_uuid, query_err};

/// SQLite-backed implementation of `WorkflowRepository`.
pub struct SqliteWorkflowRepository {
    pool: DatabasePool,
}

impl SqliteWorkflowRepository {
    /// Create a new repository backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

// ---------------------------------------------------------------------------
// Internal row types
// ---------------------------------------------------------------------------

struct TaskRow {
    id: String,
    description: String,
    location: Option<String>,
    assignment_date: String,
    state: String,
    worker_id: String,
    supervisor_id: Option<String>,
    group_id: Option<String>,
    created_by_worker: bool,
    cancelled_by: Option<String>,
    cancellation_reason: Option<String>,
    cancelled_at: Option<String>,
    created_at: String,
    updated_at: String,
}

impl TaskRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            description: row.try_get("description")?,
            location: row.try_get("location")?,
            assignment_date: row.try_get("assignment_date")?,
            state: row.try_get("state")?,
            worker_id: row.try_get("worker_id")?,
            supervisor_id: row.try_get("supervisor_id")?,
            group_id: row.try_get("group_id")?,
            created_by_worker: row.try_get("created_by_worker")?,
            cancelled_by: row.try_get("cancelled_by")?,
            cancellation_reason: row.try_get("cancellation_reason")?,
            cancelled_at: row.try_get("cancelled_at")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn into_task(self) -> Result<Task, RepositoryError> {
        let state: TaskState = self.state.parse().map_err(RepositoryError::Query)?;
        let cancelled_by = self
            .cancelled_by
            .as_deref()
            .map(|s| s.parse::<CancelledBy>().map_err(RepositoryError::Query))
            .transpose()?;

        Ok(Task {
            id: TaskId(parse_uuid(&self.id)?),
            description: self.description,
            location: self.location,
            assignment_date: parse_day(&self.assignment_date)?,
            state,
            worker_id: parse_uuid(&self.worker_id)?,
            supervisor_id: self.supervisor_id.as_deref().map(parse_uuid).transpose()?,
            group_id: self.group_id.as_deref().map(parse_uuid).transpose()?,
            created_by_worker: self.created_by_worker,
            cancelled_by,
            cancellation_reason: self.cancellation_reason,
            cancelled_at: self.cancelled_at.as_deref().map(parse_datetime).transpose()?,
            created_at: parse_datetime(&self.created_at)?,
            updated_at: parse_datetime(&self.updated_at)?,
        })
    }
}

fn row_to_task(row: &sqlx::sqlite::SqliteRow) -> Result<Task, RepositoryError> {
    TaskRow::from_row(row).map_err(query_err)?.into_task()
}

fn row_to_checklist(row: &sqlx::sqlite::SqliteRow) -> Result<Checklist, RepositoryError> {
    let id: String = row.try_get("id").map_err(query_err)?;
    let task_id: String = row.try_get("task_id").map_err(query_err)?;
    let worker_id: String = row.try_get("worker_id").map_err(query_err)?;
    let submitted_at: String = row.try_get("submitted_at").map_err(query_err)?;
    let procedure_id: Option<String> = row.try_get("procedure_id").map_err(query_err)?;
    let reviewed_at: Option<String> = row.try_get("reviewed_at").map_err(query_err)?;

    Ok(Checklist {
        id: ChecklistId(parse_uuid(&id)?),
        task_id: TaskId(parse_uuid(&task_id)?),
        worker_id: parse_uuid(&worker_id)?,
        submitted_at: parse_datetime(&submitted_at)?,
        procedure_id: procedure_id.as_deref().map(parse_uuid).transpose()?,
        additional_hazards: row.try_get("additional_hazards").map_err(query_err)?,
        comments: row.try_get("comments").map_err(query_err)?,
        requires_secondary_verification: row
            .try_get("requires_secondary_verification")
            .map_err(query_err)?,
        approved: row.try_get("approved").map_err(query_err)?,
        reviewed_at: reviewed_at.as_deref().map(parse_datetime).transpose()?,
        reviewer_comments: row.try_get("reviewer_comments").map_err(query_err)?,
    })
}

fn row_to_verification(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<SecondaryVerification, RepositoryError> {
    let id: String = row.try_get("id").map_err(query_err)?;
    let checklist_id: String = row.try_get("checklist_id").map_err(query_err)?;
    let uploaded_at: String = row.try_get("uploaded_at").map_err(query_err)?;
    Ok(SecondaryVerification {
        id: parse_uuid(&id)?,
        checklist_id: ChecklistId(parse_uuid(&checklist_id)?),
        image1_url: row.try_get("image1_url").map_err(query_err)?,
        image2_url: row.try_get("image2_url").map_err(query_err)?,
        uploaded_at: parse_datetime(&uploaded_at)?,
    })
}

// ---------------------------------------------------------------------------
// Statements shared by single writes and transactions
// ---------------------------------------------------------------------------

async fn insert_task(conn: &mut SqliteConnection, task: &Task) -> Result<(), RepositoryError> {
    sqlx::query(
        r#"INSERT INTO tasks
           (id, description, location, assignment_date, state, worker_id, supervisor_id,
            group_id, created_by_worker, cancelled_by, cancellation_reason, cancelled_at,
            created_at, updated_at)
           VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
    )
    .bind(task.id.to_string())
    .bind(&task.description)
    .bind(&task.location)
    .bind(format_day(&task.assignment_date))
    .bind(task.state.as_str())
    .bind(task.worker_id.to_string())
    .bind(task.supervisor_id.map(|id| id.to_string()))
    .bind(task.group_id.map(|id| id.to_string()))
    .bind(task.created_by_worker)
    .bind(task.cancelled_by.map(|c| c.to_string()))
    .bind(&task.cancellation_reason)
    .bind(task.cancelled_at.as_ref().map(format_datetime))
    .bind(format_datetime(&task.created_at))
    .bind(format_datetime(&task.updated_at))
    .execute(&mut *conn)
    .await
    .map_err(|e| {
        if let sqlx::Error::Database(ref db_err) = e {
            if db_err.message().contains("UNIQUE") {
                return RepositoryError::Conflict(format!("task {} already exists", task.id));
            }
        }
        query_err(e)
    })?;
    Ok(())
}

async fn write_task(conn: &mut SqliteConnection, task: &Task) -> Result<(), RepositoryError> {
    let result = sqlx::query(
        r#"UPDATE tasks SET
             state = ?, supervisor_id = ?, cancelled_by = ?, cancellation_reason = ?,
             cancelled_at = ?, updated_at = ?
           WHERE id = ?"#,
    )
    .bind(task.state.as_str())
    .bind(task.supervisor_id.map(|id| id.to_string()))
    .bind(task.cancelled_by.map(|c| c.to_string()))
    .bind(&task.cancellation_reason)
    .bind(task.cancelled_at.as_ref().map(format_datetime))
    .bind(format_datetime(&task.updated_at))
    .bind(task.id.to_string())
    .execute(&mut *conn)
    .await
    .map_err(query_err)?;

    if result.rows_affected() == 0 {
        return Err(RepositoryError::NotFound);
    }
    Ok(())
}

async fn write_checklist(
    conn: &mut SqliteConnection,
    checklist: &Checklist,
) -> Result<(), RepositoryError> {
    sqlx::query(
        r#"INSERT INTO checklists
           (id, task_id, worker_id, submitted_at, procedure_id, additional_hazards, comments,
            requires_secondary_verification, approved, reviewed_at, reviewer_comments)
           VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
           ON CONFLICT(id) DO UPDATE SET
             worker_id = excluded.worker_id,
             submitted_at = excluded.submitted_at,
             procedure_id = excluded.procedure_id,
             additional_hazards = excluded.additional_hazards,
             comments = excluded.comments,
             requires_secondary_verification = excluded.requires_secondary_verification,
             approved = excluded.approved,
             reviewed_at = excluded.reviewed_at,
             reviewer_comments = excluded.reviewer_comments"#,
    )
    .bind(checklist.id.to_string())
    .bind(checklist.task_id.to_string())
    .bind(checklist.worker_id.to_string())
    .bind(format_datetime(&checklist.submitted_at))
    .bind(checklist.procedure_id.map(|id| id.to_string()))
    .bind(&checklist.additional_hazards)
    .bind(&checklist.comments)
    .bind(checklist.requires_secondary_verification)
    .bind(checklist.approved)
    .bind(checklist.reviewed_at.as_ref().map(format_datetime))
    .bind(&checklist.reviewer_comments)
    .execute(&mut *conn)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(ref db_err) if db_err.message().contains("FOREIGN KEY") => {
            RepositoryError::Conflict(format!(
                "checklist {} references a missing task, worker or procedure",
                checklist.id
            ))
        }
        other => query_err(other),
    })?;
    Ok(())
}

fn row_to_procedure(row: &sqlx::sqlite::SqliteRow) -> Result<Procedure, RepositoryError> {
    let id: String = row.try_get("id").map_err(query_err)?;
    let created_at: String = row.try_get("created_at").map_err(query_err)?;
    Ok(Procedure {
        id: parse_uuid(&id)?,
        name: row.try_get("name").map_err(query_err)?,
        description: row.try_get("description").map_err(query_err)?,
        document_url: row.try_get("document_url").map_err(query_err)?,
        active: row.try_get("active").map_err(query_err)?,
        created_at: parse_datetime(&created_at)?,
    })
}

// ---------------------------------------------------------------------------
// ProcedureRepository impl
// ---------------------------------------------------------------------------

impl ProcedureRepository for SqliteWorkflowRepository {
    async fn list_procedures(&self, active_only: bool) -> Result<Vec<Procedure>, RepositoryError> {
        let sql = if active_only {
            "SELECT * FROM procedures WHERE active = 1 ORDER BY name ASC, id ASC"
        } else {
            "SELECT * FROM procedures ORDER BY name ASC, id ASC"
        };
        let rows = sqlx::query(sql)
            .fetch_all(&self.pool.reader)
            .await
            .map_err(query_err)?;

        rows.iter().map(row_to_procedure).collect()
    }

    async fn get_procedure(&self, id: &Uuid) -> Result<Option<Procedure>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM procedures WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(query_err)?;

        row.as_ref().map(row_to_procedure).transpose()
    }
}

// ---------------------------------------------------------------------------
// WorkflowRepository impl
// ---------------------------------------------------------------------------

impl WorkflowRepository for SqliteWorkflowRepository {
    async fn create_tasks(&self, tasks: &[Task]) -> Result<(), RepositoryError> {
        let mut tx = self.pool.writer.begin().await.map_err(query_err)?;
        for task in tasks {
            insert_task(&mut tx, task).await?;
        }
        tx.commit().await.map_err(query_err)?;
        Ok(())
    }

    async fn get_task(&self, id: &TaskId) -> Result<Option<Task>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM tasks WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(query_err)?;

        row.as_ref().map(row_to_task).transpose()
    }

    async fn list_tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>, RepositoryError> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT * FROM tasks WHERE 1 = 1");

        if let Some(day) = &filter.assignment_date {
            qb.push(" AND assignment_date = ").push_bind(format_day(day));
        }
        if let Some(state) = filter.state {
            qb.push(" AND state = ").push_bind(state.as_str());
        }
        if let Some(worker_id) = filter.worker_id {
            qb.push(" AND worker_id = ").push_bind(worker_id.to_string());
        }
        if let Some(supervisor_id) = filter.supervisor_id {
            qb.push(" AND (supervisor_id = ").push_bind(supervisor_id.to_string());
            if filter.include_unsupervised {
                qb.push(" OR supervisor_id IS NULL");
            }
            qb.push(")");
        }
        qb.push(match filter.sort_order {
            SortOrder::Asc => " ORDER BY created_at ASC, id ASC",
            SortOrder::Desc => " ORDER BY created_at DESC, id DESC",
        });

        let rows = qb
            .build()
            .fetch_all(&self.pool.reader)
            .await
            .map_err(query_err)?;

        rows.iter().map(row_to_task).collect()
    }

    async fn list_stale_pending(&self, day: NaiveDate) -> Result<Vec<Task>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT * FROM tasks WHERE state = ? AND assignment_date < ? ORDER BY assignment_date ASC, id ASC",
        )
        .bind(TaskState::Pending.as_str())
        .bind(format_day(&day))
        .fetch_all(&self.pool.reader)
        .await
        .map_err(query_err)?;

        rows.iter().map(row_to_task).collect()
    }

    async fn update_task(&self, task: &Task) -> Result<(), RepositoryError> {
        let mut conn = self.pool.writer.acquire().await.map_err(query_err)?;
        write_task(&mut conn, task).await
    }

    async fn get_checklist(&self, id: &ChecklistId) -> Result<Option<Checklist>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM checklists WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(query_err)?;

        row.as_ref().map(row_to_checklist).transpose()
    }

    async fn get_checklist_by_task(
        &self,
        task_id: &TaskId,
    ) -> Result<Option<Checklist>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM checklists WHERE task_id = ?")
            .bind(task_id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(query_err)?;

        row.as_ref().map(row_to_checklist).transpose()
    }

    async fn get_answers(
        &self,
        checklist_id: &ChecklistId,
    ) -> Result<Vec<ChecklistAnswer>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT step, question, answer FROM checklist_answers WHERE checklist_id = ? ORDER BY step ASC, ordinal ASC",
        )
        .bind(checklist_id.to_string())
        .fetch_all(&self.pool.reader)
        .await
        .map_err(query_err)?;

        let mut answers = Vec::with_capacity(rows.len());
        for row in &rows {
            let step: i64 = row.try_get("step").map_err(query_err)?;
            let step = u8::try_from(step)
                .map_err(|_| RepositoryError::Query(format!("invalid step: {step}")))?;
            answers.push(ChecklistAnswer {
                step,
                question: row.try_get("question").map_err(query_err)?,
                answer: row.try_get("answer").map_err(query_err)?,
            });
        }
        Ok(answers)
    }

    async fn commit_submission(
        &self,
        task: &Task,
        checklist: &Checklist,
        answers: &[ChecklistAnswer],
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.writer.begin().await.map_err(query_err)?;

        write_checklist(&mut tx, checklist).await?;

        sqlx::query("DELETE FROM checklist_answers WHERE checklist_id = ?")
            .bind(checklist.id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(query_err)?;

        for (ordinal, answer) in answers.iter().enumerate() {
            sqlx::query(
                r#"INSERT INTO checklist_answers (checklist_id, ordinal, step, question, answer)
                   VALUES (?, ?, ?, ?, ?)"#,
            )
            .bind(checklist.id.to_string())
            .bind(ordinal as i64)
            .bind(i64::from(answer.step))
            .bind(&answer.question)
            .bind(answer.answer)
            .execute(&mut *tx)
            .await
            .map_err(query_err)?;
        }

        write_task(&mut tx, task).await?;
        tx.commit().await.map_err(query_err)?;
        Ok(())
    }

    async fn commit_review(&self, task: &Task, checklist: &Checklist) -> Result<(), RepositoryError> {
        let mut tx = self.pool.writer.begin().await.map_err(query_err)?;
        write_checklist(&mut tx, checklist).await?;
        write_task(&mut tx, task).await?;
        tx.commit().await.map_err(query_err)?;
        Ok(())
    }

    async fn get_verification(
        &self,
        checklist_id: &ChecklistId,
    ) -> Result<Option<SecondaryVerification>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM secondary_verifications WHERE checklist_id = ?")
            .bind(checklist_id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(query_err)?;

        row.as_ref().map(row_to_verification).transpose()
    }

    async fn commit_verification(
        &self,
        task: &Task,
        verification: &SecondaryVerification,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.writer.begin().await.map_err(query_err)?;

        sqlx::query(
            r#"INSERT INTO secondary_verifications (id, checklist_id, image1_url, image2_url, uploaded_at)
               VALUES (?, ?, ?, ?, ?)
               ON CONFLICT(checklist_id) DO UPDATE SET
                 image1_url = excluded.image1_url,
                 image2_url = excluded.image2_url,
                 uploaded_at = excluded.uploaded_at"#,
        )
        .bind(verification.id.to_string())
        .bind(verification.checklist_id.to_string())
        .bind(&verification.image1_url)
        .bind(&verification.image2_url)
        .bind(format_datetime(&verification.uploaded_at))
        .execute(&mut *tx)
        .await
        .map_err(query_err)?;

        write_task(&mut tx, task).await?;
        tx.commit().await.map_err(query_err)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::fixtures::{Seeded, insert_procedure, seeded_pool};
    use chrono::{Duration, Utc};

    fn make_task(seeded: &Seeded, day: NaiveDate, supervised: bool) -> Task {
        let now = Utc::now();
        Task {
            id: TaskId::new(),
            description: "Replace gasket".to_string(),
            location: Some("Line 3".to_string()),
            assignment_date: day,
            state: TaskState::Pending,
            worker_id: seeded.worker.id,
            supervisor_id: supervised.then_some(seeded.supervisor.id),
            group_id: None,
            created_by_worker: !supervised,
            cancelled_by: None,
            cancellation_reason: None,
            cancelled_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn make_checklist(task: &Task) -> Checklist {
        Checklist {
            id: ChecklistId::new(),
            task_id: task.id,
            worker_id: task.worker_id,
            submitted_at: Utc::now(),
            procedure_id: None,
            additional_hazards: None,
            comments: Some("wet floor".to_string()),
            requires_secondary_verification: true,
            approved: None,
            reviewed_at: None,
            reviewer_comments: None,
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 10).unwrap()
    }

    #[tokio::test]
    async fn test_create_and_get_task() {
        let (_dir, seeded) = seeded_pool().await;
        let repo = SqliteWorkflowRepository::new(seeded.pool.clone());
        let task = make_task(&seeded, today(), true);

        repo.create_tasks(std::slice::from_ref(&task)).await.unwrap();
        let found = repo.get_task(&task.id).await.unwrap().unwrap();
        assert_eq!(found, task);

        assert!(repo.get_task(&TaskId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_paired_create_is_atomic() {
        let (_dir, seeded) = seeded_pool().await;
        let repo = SqliteWorkflowRepository::new(seeded.pool.clone());
        let first = make_task(&seeded, today(), true);
        let mut second = make_task(&seeded, today(), true);
        // Unknown worker violates the foreign key.
        second.worker_id = Uuid::now_v7();

        assert!(repo.create_tasks(&[first.clone(), second]).await.is_err());
        assert!(repo.get_task(&first.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_tasks_filters() {
        let (_dir, seeded) = seeded_pool().await;
        let repo = SqliteWorkflowRepository::new(seeded.pool.clone());
        let supervised = make_task(&seeded, today(), true);
        let mut unsupervised = make_task(&seeded, today(), false);
        unsupervised.created_at = supervised.created_at + Duration::seconds(1);
        let older = make_task(&seeded, today() - Duration::days(1), true);
        repo.create_tasks(&[supervised.clone(), unsupervised.clone(), older.clone()])
            .await
            .unwrap();

        let by_day = repo
            .list_tasks(&TaskFilter {
                assignment_date: Some(today()),
                ..TaskFilter::default()
            })
            .await
            .unwrap();
        let ids: Vec<_> = by_day.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![unsupervised.id, supervised.id]);

        let strict = repo
            .list_tasks(&TaskFilter {
                supervisor_id: Some(seeded.supervisor.id),
                ..TaskFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(strict.len(), 2);
        assert!(strict.iter().all(|t| t.supervisor_id.is_some()));

        let with_unsupervised = repo
            .list_tasks(&TaskFilter {
                supervisor_id: Some(seeded.supervisor.id),
                include_unsupervised: true,
                sort_order: SortOrder::Asc,
                ..TaskFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(with_unsupervised.len(), 3);

        let none = repo
            .list_tasks(&TaskFilter {
                state: Some(TaskState::Completed),
                ..TaskFilter::default()
            })
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_list_stale_pending_is_strictly_before_day() {
        let (_dir, seeded) = seeded_pool().await;
        let repo = SqliteWorkflowRepository::new(seeded.pool.clone());
        let stale = make_task(&seeded, today() - Duration::days(1), true);
        let current = make_task(&seeded, today(), true);
        let mut submitted = make_task(&seeded, today() - Duration::days(3), true);
        submitted.state = TaskState::ChecklistSubmitted;
        repo.create_tasks(&[stale.clone(), current, submitted])
            .await
            .unwrap();

        let found = repo.list_stale_pending(today()).await.unwrap();
        assert_eq!(found.iter().map(|t| t.id).collect::<Vec<_>>(), vec![stale.id]);
    }

    #[tokio::test]
    async fn test_update_missing_task_is_not_found() {
        let (_dir, seeded) = seeded_pool().await;
        let repo = SqliteWorkflowRepository::new(seeded.pool.clone());
        let task = make_task(&seeded, today(), true);
        let err = repo.update_task(&task).await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound));
    }

    #[tokio::test]
    async fn test_resubmission_replaces_answers() {
        let (_dir, seeded) = seeded_pool().await;
        let repo = SqliteWorkflowRepository::new(seeded.pool.clone());
        let mut task = make_task(&seeded, today(), true);
        repo.create_tasks(std::slice::from_ref(&task)).await.unwrap();

        let procedure = insert_procedure(&seeded.pool, "Hot Work", true).await;
        let mut checklist = make_checklist(&task);
        checklist.procedure_id = Some(procedure.id);
        task.state = TaskState::ChecklistSubmitted;
        let first: Vec<_> = (1..=5)
            .map(|step| ChecklistAnswer::new(step, format!("q{step}"), true))
            .collect();
        repo.commit_submission(&task, &checklist, &first).await.unwrap();
        assert_eq!(repo.get_answers(&checklist.id).await.unwrap().len(), 5);

        checklist.approved = Some(false);
        checklist.reviewer_comments = Some("missing PPE".to_string());
        task.state = TaskState::UnderReview;
        repo.commit_review(&task, &checklist).await.unwrap();

        checklist.approved = None;
        checklist.reviewer_comments = None;
        task.state = TaskState::ChecklistSubmitted;
        let second = vec![
            ChecklistAnswer::new(4, "q4", false),
            ChecklistAnswer::new(2, "q2", true),
        ];
        repo.commit_submission(&task, &checklist, &second).await.unwrap();

        let answers = repo.get_answers(&checklist.id).await.unwrap();
        assert_eq!(answers.iter().map(|a| a.step).collect::<Vec<_>>(), vec![2, 4]);
        let stored = repo.get_checklist_by_task(&task.id).await.unwrap().unwrap();
        assert_eq!(stored.approved, None);
        assert_eq!(stored.reviewer_comments, None);
        assert_eq!(stored.procedure_id, checklist.procedure_id);
        assert_eq!(
            repo.get_task(&task.id).await.unwrap().unwrap().state,
            TaskState::ChecklistSubmitted
        );
    }

    #[tokio::test]
    async fn test_repeated_steps_are_stored_in_submission_order() {
        let (_dir, seeded) = seeded_pool().await;
        let repo = SqliteWorkflowRepository::new(seeded.pool.clone());
        let mut task = make_task(&seeded, today(), true);
        repo.create_tasks(std::slice::from_ref(&task)).await.unwrap();

        let checklist = make_checklist(&task);
        task.state = TaskState::ChecklistSubmitted;
        let answers = vec![
            ChecklistAnswer::new(3, "q3", true),
            ChecklistAnswer::new(1, "q1", true),
            ChecklistAnswer::new(3, "q3 again", false),
        ];
        repo.commit_submission(&task, &checklist, &answers).await.unwrap();

        let stored = repo.get_answers(&checklist.id).await.unwrap();
        let pairs: Vec<(u8, &str)> = stored.iter().map(|a| (a.step, a.question.as_str())).collect();
        assert_eq!(pairs, vec![(1, "q1"), (3, "q3"), (3, "q3 again")]);
    }

    #[tokio::test]
    async fn test_failed_submission_rolls_back() {
        let (_dir, seeded) = seeded_pool().await;
        let repo = SqliteWorkflowRepository::new(seeded.pool.clone());
        let mut task = make_task(&seeded, today(), true);
        repo.create_tasks(std::slice::from_ref(&task)).await.unwrap();

        let mut checklist = make_checklist(&task);
        // Not in the catalog: the foreign key rejects the whole commit.
        checklist.procedure_id = Some(Uuid::now_v7());
        task.state = TaskState::ChecklistSubmitted;
        let err = repo
            .commit_submission(&task, &checklist, &[ChecklistAnswer::new(1, "q1", true)])
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)), "{err:?}");

        let out_of_range = make_checklist(&task);
        let err = repo
            .commit_submission(&task, &out_of_range, &[ChecklistAnswer::new(6, "q6", true)])
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Query(_)), "{err:?}");

        assert!(repo.get_checklist(&checklist.id).await.unwrap().is_none());
        assert!(repo.get_checklist(&out_of_range.id).await.unwrap().is_none());
        assert_eq!(
            repo.get_task(&task.id).await.unwrap().unwrap().state,
            TaskState::Pending
        );
    }

    #[tokio::test]
    async fn test_procedure_catalog() {
        let (_dir, seeded) = seeded_pool().await;
        let repo = SqliteWorkflowRepository::new(seeded.pool.clone());
        let welding = insert_procedure(&seeded.pool, "Welding", true).await;
        let retired = insert_procedure(&seeded.pool, "Asbestos Removal", false).await;

        let all = repo.list_procedures(false).await.unwrap();
        assert_eq!(all, vec![retired.clone(), welding.clone()]);
        let active = repo.list_procedures(true).await.unwrap();
        assert_eq!(active, vec![welding.clone()]);

        assert_eq!(repo.get_procedure(&retired.id).await.unwrap(), Some(retired));
        assert!(repo.get_procedure(&Uuid::now_v7()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_verification_upsert_keeps_one_row() {
        let (_dir, seeded) = seeded_pool().await;
        let repo = SqliteWorkflowRepository::new(seeded.pool.clone());
        let mut task = make_task(&seeded, today(), true);
        repo.create_tasks(std::slice::from_ref(&task)).await.unwrap();
        let checklist = make_checklist(&task);
        repo.commit_submission(&task, &checklist, &[ChecklistAnswer::new(2, "q2", false)])
            .await
            .unwrap();

        task.state = TaskState::ReadyToStart;
        let mut verification = SecondaryVerification {
            id: Uuid::now_v7(),
            checklist_id: checklist.id,
            image1_url: "/media/a.png".to_string(),
            image2_url: "/media/b.png".to_string(),
            uploaded_at: Utc::now(),
        };
        repo.commit_verification(&task, &verification).await.unwrap();

        verification.image2_url = "/media/c.png".to_string();
        repo.commit_verification(&task, &verification).await.unwrap();

        let stored = repo.get_verification(&checklist.id).await.unwrap().unwrap();
        assert_eq!(stored.image2_url, "/media/c.png");
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM secondary_verifications")
            .fetch_one(&seeded.pool.reader)
            .await
            .unwrap();
        assert_eq!(count, 1);
        assert_eq!(
            repo.get_task(&task.id).await.unwrap().unwrap().state,
            TaskState::ReadyToStart
        );
    }
}

//! SQLite identity directory.
//!
//! Implements `DirectoryRepository` (worker/supervisor profiles) and
//! `ActorResolver` (bearer token → actor) from `toma5-core`. Accounts and
//! sessions are provisioned elsewhere; this side reads them and only writes
//! the worker's daily availability flag.

use toma5_core::repository::directory::{ActorResolver, DirectoryRepository, WorkerFilter};
use toma5_types::actor::{Actor, Role, SupervisorProfile, WorkerProfile};
use toma5_types::error::{AuthError, RepositoryError};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite};
use tracing::debug;
use uuid::Uuid;

use super::pool::DatabasePool;
use super::{parse_uuid, query_err};
use crate::token::hash_token;

/// SQLite-backed identity directory.
pub struct SqliteDirectory {
    pool: DatabasePool,
}

impl SqliteDirectory {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    async fn fetch_row(
        &self,
        table: Table,
        column: &str,
        value: &Uuid,
    ) -> Result<Option<SqliteRow>, RepositoryError> {
        // `table` and `column` are compile-time constants, never user input.
        let sql = format!(
            "SELECT {} FROM {} WHERE {column} = ?",
            table.columns(),
            table.name()
        );
        sqlx::query(&sql)
            .bind(value.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(query_err)
    }
}

#[derive(Clone, Copy)]
enum Table {
    Workers,
    Supervisors,
}

impl Table {
    fn name(self) -> &'static str {
        match self {
            Table::Workers => "workers",
            Table::Supervisors => "supervisors",
        }
    }

    fn columns(self) -> &'static str {
        match self {
            Table::Workers => "id, user_id, full_name, active, shift, available",
            Table::Supervisors => "id, user_id, full_name, active",
        }
    }
}

/// Columns shared by worker and supervisor profiles.
struct Profile {
    id: Uuid,
    user_id: Uuid,
    full_name: String,
    active: bool,
}

impl Profile {
    fn from_row(row: &SqliteRow) -> Result<Self, RepositoryError> {
        let id: String = row.try_get("id").map_err(query_err)?;
        let user_id: String = row.try_get("user_id").map_err(query_err)?;
        Ok(Self {
            id: parse_uuid(&id)?,
            user_id: parse_uuid(&user_id)?,
            full_name: row.try_get("full_name").map_err(query_err)?,
            active: row.try_get("active").map_err(query_err)?,
        })
    }
}

fn row_to_worker(row: &SqliteRow) -> Result<WorkerProfile, RepositoryError> {
    let base = Profile::from_row(row)?;
    Ok(WorkerProfile {
        id: base.id,
        user_id: base.user_id,
        full_name: base.full_name,
        active: base.active,
        shift: row.try_get("shift").map_err(query_err)?,
        available: row.try_get("available").map_err(query_err)?,
    })
}

fn row_to_supervisor(row: &SqliteRow) -> Result<SupervisorProfile, RepositoryError> {
    let base = Profile::from_row(row)?;
    Ok(SupervisorProfile {
        id: base.id,
        user_id: base.user_id,
        full_name: base.full_name,
        active: base.active,
    })
}

impl DirectoryRepository for SqliteDirectory {
    async fn find_worker_by_user(
        &self,
        user_id: &Uuid,
    ) -> Result<Option<WorkerProfile>, RepositoryError> {
        self.fetch_row(Table::Workers, "user_id", user_id)
            .await?
            .as_ref()
            .map(row_to_worker)
            .transpose()
    }

    async fn find_supervisor_by_user(
        &self,
        user_id: &Uuid,
    ) -> Result<Option<SupervisorProfile>, RepositoryError> {
        self.fetch_row(Table::Supervisors, "user_id", user_id)
            .await?
            .as_ref()
            .map(row_to_supervisor)
            .transpose()
    }

    async fn get_worker(&self, worker_id: &Uuid) -> Result<Option<WorkerProfile>, RepositoryError> {
        self.fetch_row(Table::Workers, "id", worker_id)
            .await?
            .as_ref()
            .map(row_to_worker)
            .transpose()
    }

    async fn get_supervisor(
        &self,
        supervisor_id: &Uuid,
    ) -> Result<Option<SupervisorProfile>, RepositoryError> {
        self.fetch_row(Table::Supervisors, "id", supervisor_id)
            .await?
            .as_ref()
            .map(row_to_supervisor)
            .transpose()
    }

    async fn list_active_supervisors(&self) -> Result<Vec<SupervisorProfile>, RepositoryError> {
        let rows = sqlx::query(
            r#"SELECT s.id, s.user_id, s.full_name, s.active
               FROM supervisors s JOIN users u ON u.id = s.user_id
               WHERE s.active = 1 AND u.active = 1
               ORDER BY s.full_name ASC"#,
        )
        .fetch_all(&self.pool.reader)
        .await
        .map_err(query_err)?;

        rows.iter().map(row_to_supervisor).collect()
    }

    async fn list_workers(&self, filter: &WorkerFilter) -> Result<Vec<WorkerProfile>, RepositoryError> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT id, user_id, full_name, active, shift, available FROM workers WHERE 1 = 1",
        );
        if let Some(shift) = filter.normalized_shift() {
            qb.push(" AND UPPER(shift) = ").push_bind(shift);
        }
        if let Some(available) = filter.available {
            qb.push(" AND available = ").push_bind(available);
        }
        // NULL shifts sort first, like `None` does.
        qb.push(" ORDER BY shift ASC, full_name ASC");

        let rows = qb
            .build()
            .fetch_all(&self.pool.reader)
            .await
            .map_err(query_err)?;

        rows.iter().map(row_to_worker).collect()
    }

    async fn set_worker_availability(
        &self,
        worker_id: &Uuid,
        available: bool,
    ) -> Result<WorkerProfile, RepositoryError> {
        let row = sqlx::query(
            r#"UPDATE workers SET available = ? WHERE id = ?
               RETURNING id, user_id, full_name, active, shift, available"#,
        )
        .bind(available)
        .bind(worker_id.to_string())
        .fetch_optional(&self.pool.writer)
        .await
        .map_err(query_err)?
        .ok_or(RepositoryError::NotFound)?;

        row_to_worker(&row)
    }
}

impl ActorResolver for SqliteDirectory {
    async fn resolve_actor(&self, token: &str) -> Result<Actor, AuthError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(AuthError::Unauthorized);
        }

        let row = sqlx::query(
            r#"SELECT s.id AS session_id, u.id AS user_id, u.role, u.active, u.current_session_id
               FROM sessions s JOIN users u ON u.id = s.user_id
               WHERE s.token_hash = ?"#,
        )
        .bind(hash_token(token))
        .fetch_optional(&self.pool.reader)
        .await
        .map_err(|e| AuthError::Storage(e.to_string()))?
        .ok_or(AuthError::Unauthorized)?;

        let storage = |e: sqlx::Error| AuthError::Storage(e.to_string());
        let session_id: String = row.try_get("session_id").map_err(storage)?;
        let user_id: String = row.try_get("user_id").map_err(storage)?;
        let role: String = row.try_get("role").map_err(storage)?;
        let active: bool = row.try_get("active").map_err(storage)?;
        let current: Option<String> = row.try_get("current_session_id").map_err(storage)?;

        if current.as_deref() != Some(session_id.as_str()) {
            debug!(user_id = %user_id, "rejected superseded session");
            return Err(AuthError::SessionInvalidated);
        }
        if !active {
            return Err(AuthError::AccountDisabled);
        }

        let user_id = parse_uuid(&user_id).map_err(|e| AuthError::Storage(e.to_string()))?;
        let role: Role = role.parse().map_err(AuthError::Storage)?;
        if role == Role::System {
            return Err(AuthError::Unauthorized);
        }
        Ok(Actor::new(user_id, role))
    }
}

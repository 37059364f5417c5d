//! Seed data for repository tests. Identities are provisioned outside the
//! service, so tests write them with plain SQL.

use chrono::Utc;
use tempfile::TempDir;
use toma5_types::actor::{Role, SupervisorProfile, WorkerProfile};
use toma5_types::procedure::Procedure;
use uuid::Uuid;

use super::format_datetime;
use crate::token::hash_token;
use super::pool::DatabasePool;

pub(crate) struct Seeded {
    pub pool: DatabasePool,
    pub worker: WorkerProfile,
    pub supervisor: SupervisorProfile,
}

pub(crate) async fn test_pool() -> (TempDir, DatabasePool) {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("test.db");
    let url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = DatabasePool::new(&url).await.unwrap();
    (dir, pool)
}

/// A pool holding one active worker and one active supervisor.
pub(crate) async fn seeded_pool() -> (TempDir, Seeded) {
    let (dir, pool) = test_pool().await;
    let worker = insert_worker(&pool, "luis", "Luis Pardo").await;
    let supervisor = insert_supervisor(&pool, "marta", "Marta Ruiz").await;
    (
        dir,
        Seeded {
            pool,
            worker,
            supervisor,
        },
    )
}

pub(crate) async fn insert_user(pool: &DatabasePool, username: &str, role: Role) -> Uuid {
    let id = Uuid::now_v7();
    sqlx::query("INSERT INTO users (id, username, role, active, created_at) VALUES (?, ?, ?, 1, ?)")
        .bind(id.to_string())
        .bind(username)
        .bind(role.as_str())
        .bind(format_datetime(&Utc::now()))
        .execute(&pool.writer)
        .await
        .unwrap();
    id
}

pub(crate) async fn insert_worker(pool: &DatabasePool, username: &str, name: &str) -> WorkerProfile {
    insert_worker_on_shift(pool, username, name, None).await
}

pub(crate) async fn insert_worker_on_shift(
    pool: &DatabasePool,
    username: &str,
    name: &str,
    shift: Option<&str>,
) -> WorkerProfile {
    let user_id = insert_user(pool, username, Role::Worker).await;
    let profile = WorkerProfile {
        id: Uuid::now_v7(),
        user_id,
        full_name: name.to_string(),
        active: true,
        shift: shift.map(str::to_uppercase),
        available: true,
    };
    sqlx::query(
        "INSERT INTO workers (id, user_id, full_name, active, shift, available) VALUES (?, ?, ?, 1, ?, 1)",
    )
    .bind(profile.id.to_string())
    .bind(user_id.to_string())
    .bind(name)
    .bind(&profile.shift)
    .execute(&pool.writer)
    .await
    .unwrap();
    profile
}

pub(crate) async fn insert_supervisor(
    pool: &DatabasePool,
    username: &str,
    name: &str,
) -> SupervisorProfile {
    let user_id = insert_user(pool, username, Role::Supervisor).await;
    let profile = SupervisorProfile {
        id: Uuid::now_v7(),
        user_id,
        full_name: name.to_string(),
        active: true,
    };
    sqlx::query("INSERT INTO supervisors (id, user_id, full_name, active) VALUES (?, ?, ?, 1)")
        .bind(profile.id.to_string())
        .bind(user_id.to_string())
        .bind(name)
        .execute(&pool.writer)
        .await
        .unwrap();
    profile
}

/// Record a login for `user_id` and make it the user's current session.
pub(crate) async fn login(pool: &DatabasePool, user_id: Uuid, token: &str) {
    let session_id = Uuid::now_v7();
    sqlx::query("INSERT INTO sessions (id, user_id, token_hash, created_at) VALUES (?, ?, ?, ?)")
        .bind(session_id.to_string())
        .bind(user_id.to_string())
        .bind(hash_token(token))
        .bind(format_datetime(&Utc::now()))
        .execute(&pool.writer)
        .await
        .unwrap();
    sqlx::query("UPDATE users SET current_session_id = ? WHERE id = ?")
        .bind(session_id.to_string())
        .bind(user_id.to_string())
        .execute(&pool.writer)
        .await
        .unwrap();
}


pub(crate) async fn insert_procedure(pool: &DatabasePool, name: &str, active: bool) -> Procedure {
    let procedure = Procedure {
        id: Uuid::now_v7(),
        name: name.to_string(),
        description: Some(format!("{name} safe work method")),
        document_url: Some(format!("/docs/{}.pdf", name.to_lowercase().replace(' ', "-"))),
        active,
        created_at: Utc::now(),
    };
    sqlx::query(
        "INSERT INTO procedures (id, name, description, document_url, active, created_at) VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(procedure.id.to_string())
    .bind(&procedure.name)
    .bind(&procedure.description)
    .bind(&procedure.document_url)
    .bind(active)
    .bind(format_datetime(&procedure.created_at))
    .execute(&pool.writer)
    .await
    .unwrap();
    procedure
}

//! Identity collaborators: worker/supervisor profiles and session resolution.
//!
//! The engine only consumes resolved actors. How sessions are issued or how a
//! newer login supersedes an older one is the implementor's concern.

use toma5_types::actor::{Actor, SupervisorProfile, WorkerProfile};
use toma5_types::error::{AuthError, RepositoryError};
use uuid::Uuid;

/// Filters for the worker directory. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerFilter {
    /// Matched case-insensitively.
    pub shift: Option<String>,
    pub available: Option<bool>,
}

impl WorkerFilter {
    /// Trimmed, upper-cased shift; blank means no filter.
    pub fn normalized_shift(&self) -> Option<String> {
        self.shift
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_uppercase)
    }
}

/// Lookup of worker and supervisor profiles.
pub trait DirectoryRepository: Send + Sync {
    fn find_worker_by_user(
        &self,
        user_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<WorkerProfile>, RepositoryError>> + Send;

    fn find_supervisor_by_user(
        &self,
        user_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<SupervisorProfile>, RepositoryError>> + Send;

    fn get_worker(
        &self,
        worker_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<WorkerProfile>, RepositoryError>> + Send;

    fn get_supervisor(
        &self,
        supervisor_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<SupervisorProfile>, RepositoryError>> + Send;

    fn list_active_supervisors(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<SupervisorProfile>, RepositoryError>> + Send;

    /// Workers matching `filter`, ordered by shift then name.
    fn list_workers(
        &self,
        filter: &WorkerFilter,
    ) -> impl std::future::Future<Output = Result<Vec<WorkerProfile>, RepositoryError>> + Send;

    /// Set the daily availability flag. `NotFound` for an unknown worker.
    fn set_worker_availability(
        &self,
        worker_id: &Uuid,
        available: bool,
    ) -> impl std::future::Future<Output = Result<WorkerProfile, RepositoryError>> + Send;
}

/// Resolves a bearer token to an actor.
pub trait ActorResolver: Send + Sync {
    fn resolve_actor(
        &self,
        token: &str,
    ) -> impl std::future::Future<Output = Result<Actor, AuthError>> + Send;
}

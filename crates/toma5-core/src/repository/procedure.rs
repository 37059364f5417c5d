//! Procedure catalog port.

use toma5_types::error::RepositoryError;
use toma5_types::procedure::Procedure;
use uuid::Uuid;

/// Read access to the work procedure catalog.
pub trait ProcedureRepository: Send + Sync {
    /// Procedures ordered by name; only active ones when `active_only`.
    fn list_procedures(
        &self,
        active_only: bool,
    ) -> impl std::future::Future<Output = Result<Vec<Procedure>, RepositoryError>> + Send;

    fn get_procedure(
        &self,
        id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<Procedure>, RepositoryError>> + Send;
}

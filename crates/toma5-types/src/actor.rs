//! Actors, roles and the capability table.
//!
//! Every engine operation starts with `actor.role.allows(capability)`. The
//! table in [`Role::allows`] is the only place role names are interpreted;
//! ownership (the assigned worker) is checked separately by the engine.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

/// Role of an authenticated identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Worker,
    Supervisor,
    Administrator,
    /// The engine itself (stale-task sweep, scheduled jobs).
    System,
}

impl Role {
    /// The capability table.
    pub fn allows(self, capability: Capability) -> bool {
        use Capability::*;
        match self {
            Role::Worker => matches!(
                capability,
                CreateTask
                    | CreatePairedTask
                    | ViewTask
                    | SubmitChecklist
                    | SubmitSecondaryVerification
                    | StartTask
                    | CompleteTask
            ),
            Role::Supervisor => matches!(
                capability,
                CreateTask
                    | CreatePairedTask
                    | ViewTask
                    | CancelTask
                    | ReviewChecklist
                    | RunSweep
                    | ViewWorkers
                    | SetWorkerAvailability
            ),
            Role::Administrator => matches!(capability, ViewTask | RunSweep | ViewWorkers),
            Role::System => matches!(capability, ViewTask | RunSweep | AutoCancel),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Worker => "WORKER",
            Role::Supervisor => "SUPERVISOR",
            Role::Administrator => "ADMINISTRATOR",
            Role::System => "SYSTEM",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "WORKER" => Ok(Role::Worker),
            "SUPERVISOR" => Ok(Role::Supervisor),
            "ADMINISTRATOR" => Ok(Role::Administrator),
            "SYSTEM" => Ok(Role::System),
            other => Err(format!("invalid role: '{other}'")),
        }
    }
}

/// A single permission the engine checks before any state inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    CreateTask,
    CreatePairedTask,
    ViewTask,
    CancelTask,
    SubmitChecklist,
    ReviewChecklist,
    SubmitSecondaryVerification,
    StartTask,
    CompleteTask,
    RunSweep,
    AutoCancel,
    /// Browse the worker directory.
    ViewWorkers,
    SetWorkerAvailability,
}

impl Capability {
    pub const ALL: [Capability; 13] = [
        Capability::CreateTask,
        Capability::CreatePairedTask,
        Capability::ViewTask,
        Capability::CancelTask,
        Capability::SubmitChecklist,
        Capability::ReviewChecklist,
        Capability::SubmitSecondaryVerification,
        Capability::StartTask,
        Capability::CompleteTask,
        Capability::RunSweep,
        Capability::AutoCancel,
        Capability::ViewWorkers,
        Capability::SetWorkerAvailability,
    ];
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Capability::CreateTask => "create_task",
            Capability::CreatePairedTask => "create_paired_task",
            Capability::ViewTask => "view_task",
            Capability::CancelTask => "cancel_task",
            Capability::SubmitChecklist => "submit_checklist",
            Capability::ReviewChecklist => "review_checklist",
            Capability::SubmitSecondaryVerification => "submit_secondary_verification",
            Capability::StartTask => "start_task",
            Capability::CompleteTask => "complete_task",
            Capability::RunSweep => "run_sweep",
            Capability::AutoCancel => "auto_cancel",
            Capability::ViewWorkers => "view_workers",
            Capability::SetWorkerAvailability => "set_worker_availability",
        };
        f.write_str(name)
    }
}

/// A resolved, already-validated identity invoking an engine operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// User account id. Nil for the system actor.
    pub user_id: Uuid,
    pub role: Role,
}

impl Actor {
    pub fn new(user_id: Uuid, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn system() -> Self {
        Self {
            user_id: Uuid::nil(),
            role: Role::System,
        }
    }

    pub fn can(&self, capability: Capability) -> bool {
        self.role.allows(capability)
    }
}

/// Worker profile linked to a user account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub full_name: String,
    pub active: bool,
    /// Crew rotation the worker belongs to, stored upper-case.
    pub shift: Option<String>,
    /// Whether the worker is available for assignments today.
    pub available: bool,
}

/// Supervisor profile linked to a user account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupervisorProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub full_name: String,
    pub active: bool,
}

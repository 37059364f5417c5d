//! The task authorization workflow.
//!
//! - `evaluator`: derives the secondary-verification requirement.
//! - `state`: the task transition table.
//! - `guard`: per-entity mutual exclusion.
//! - `engine`, `checklist`, `verification`, `sweeper`: the operations.
//! - `directory`: worker directory and procedure catalog.
//! - `clock`, `scheduler`: time source and daily trigger.

pub mod checklist;
pub mod clock;
pub mod directory;
pub mod engine;
pub mod evaluator;
pub mod guard;
pub mod scheduler;
pub mod state;
pub mod sweeper;
pub mod verification;


pub use clock::{Clock, FixedClock, SystemClock, local_day};
pub use engine::WorkflowEngine;
pub use scheduler::{DailyCallback, DailyScheduler, SchedulerError};
pub use sweeper::SweepSummary;

//! Shared domain types for the Toma 5 authorization workflow.
//!
//! Task, Checklist ("Toma 5"), SecondaryVerification ("ASST"), Notification,
//! Procedure, actor identity, and the error taxonomy shared by every layer.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod actor;
pub mod checklist;
pub mod config;
pub mod error;
pub mod notification;
pub mod procedure;
pub mod task;

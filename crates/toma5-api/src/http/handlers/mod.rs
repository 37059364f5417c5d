//! HTTP request handlers for the REST API.

pub mod checklists;
pub mod notifications;
pub mod procedures;
pub mod sweeps;
pub mod tasks;
pub mod verifications;
pub mod workers;
pub mod ws;

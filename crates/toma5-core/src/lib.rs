//! Task authorization workflow engine and repository trait definitions.
//!
//! This crate defines the "ports" (repository traits) that the infrastructure
//! layer implements, plus the engine that drives tasks through the checklist,
//! review, verification and sweep transitions. It depends only on
//! `toma5-types` -- never on `toma5-infra` or any database/IO crate.

pub mod notification;
pub mod repository;
pub mod workflow;

#[cfg(test)]
pub(crate) mod testing;

//! Repository and collaborator trait definitions (ports).
//!
//! These traits define the storage, identity and blob interfaces that the
//! infrastructure layer (toma5-infra) implements. The core crate never
//! depends on any specific storage technology.

pub mod blob;
pub mod directory;
pub mod notification;
pub mod procedure;
pub mod workflow;

/// Sort order for list queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

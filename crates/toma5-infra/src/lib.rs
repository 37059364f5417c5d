//! Infrastructure layer for toma5.
//!
//! Implementations of the ports defined in `toma5-core`: SQLite persistence
//! and identity directory, the filesystem evidence store, plus the TOML
//! configuration loader.

pub mod blob;
pub mod config;
pub mod sqlite;
pub mod token;

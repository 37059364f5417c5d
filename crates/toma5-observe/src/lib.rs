//! Observability setup shared by every toma5 entry point.

pub mod tracing_setup;

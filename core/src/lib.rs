//! Orchestrator core library.
//!
//! This crate holds every domain model, business rule and trait seam for the
//! agent orchestrator: routing, execution, workflow scheduling, the agent
//! registry, health checking, and the persistence contract they all share.
//! Transport (HTTP/RPC), the concrete filesystem store and process wiring
//! live in the `protocol`, `database` and `server` crates respectively.
//!
//! # Architecture
//!
//! - [`models`] - domain types (Task, AgentRegistration, WorkflowDefinition, ...)
//! - [`error`] - one `thiserror` enum per component family plus [`error::OrchestratorError`]
//! - [`persistence`] - the [`persistence::PersistenceStore`] trait, implemented in `database`
//! - [`validation`] - construction-time invariant checks
//! - [`registry`] - the agent registry
//! - [`health`] - the health checker
//! - [`router`] - the task router
//! - [`executor`] - the task executor
//! - [`workflow_engine`] - the workflow DAG scheduler
//! - [`checkpoint`] - workflow execution checkpointing
//! - [`clarification`] - the pending-clarification store
//! - [`orchestrator`] - the composed [`orchestrator::Orchestrator`] wiring all of the above

pub mod checkpoint;
pub mod clarification;
pub mod error;
pub mod executor;
pub mod health;
pub mod models;
pub mod orchestrator;
pub mod persistence;
pub mod registry;
pub mod router;
pub mod validation;
pub mod workflow_engine;

pub use error::{OrchestratorError, Result};
pub use orchestrator::{Orchestrator, OrchestratorConfig};

/// Current version of the core crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Current crate name.
pub const CRATE_NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crate_constants() {
        assert!(!VERSION.is_empty());
        assert_eq!(CRATE_NAME, "orchestrator-core");
    }
}

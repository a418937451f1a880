//! Agent orchestrator server.
//!
//! Wires the process entry point: layered configuration, structured
//! logging, the two file-backed persistence namespaces (general state and
//! workflow checkpoints, §6.3), the composed `Orchestrator`, and the HTTP
//! surface serving it.

pub mod config;
pub mod telemetry;

pub use config::Config;
pub use telemetry::init_telemetry;

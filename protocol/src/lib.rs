//! Agent orchestrator protocol layer.
//!
//! This crate is the transport boundary over `orchestrator-core` (§6): it
//! defines the request/response DTOs, maps core errors onto RPC/HTTP error
//! shapes, and exposes both an RPC-style method surface
//! ([`handler::OrchestratorHandler`]) and an HTTP surface
//! ([`server::build_router`]) that is a thin translation of the same
//! methods.
//!
//! # Architecture
//!
//! - [`dtos`] - request/response shapes for the RPC surface (§6.1)
//! - [`error`] - [`error::ProtocolError`], wrapping [`orchestrator_core::OrchestratorError`]
//! - [`handler`] - [`handler::OrchestratorHandler`], the RPC method surface plus the chat handshake
//! - [`server`] - the `axum` HTTP surface (§6.2), built over the same handler
//!
//! # Usage
//!
//! ```no_run
//! use orchestrator_core::{Orchestrator, OrchestratorConfig};
//! use orchestrator_core::persistence::test_support::InMemoryStore;
//! use orchestrator_protocol::handler::OrchestratorHandler;
//! use orchestrator_protocol::server::build_router;
//! use std::sync::Arc;
//!
//! async fn build_app() -> axum::Router {
//!     let orchestrator = Orchestrator::new(
//!         Arc::new(InMemoryStore::new()),
//!         Arc::new(InMemoryStore::new()),
//!         OrchestratorConfig::default(),
//!     );
//!     orchestrator.initialize().await.unwrap();
//!     let handler = OrchestratorHandler::new(Arc::new(orchestrator));
//!     build_router(handler, &["*".to_string()])
//! }
//! ```

pub mod dtos;
pub mod error;
pub mod handler;
pub mod server;

pub use dtos::{ChatRequest, ChatResponse, TaskRequest};
pub use error::ProtocolError;
pub use handler::OrchestratorHandler;
pub use server::build_router;

//! Maps orchestrator-core errors (and protocol-layer validation failures)
//! onto the RPC and HTTP error shapes from §7: `{ error_code, message }` for
//! RPC, `{ detail }` for HTTP.

use orchestrator_core::OrchestratorError;
use serde_json::{json, Value};
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum ProtocolError {
    #[error(transparent)]
    Orchestrator(#[from] OrchestratorError),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("message must not be empty")]
    EmptyMessage,
}

impl ProtocolError {
    pub fn code(&self) -> &'static str {
        match self {
            ProtocolError::Orchestrator(e) => e.code(),
            ProtocolError::InvalidRequest(_) => "InvalidRequest",
            ProtocolError::EmptyMessage => "EmptyMessage",
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            ProtocolError::Orchestrator(e) => e.status_code(),
            ProtocolError::InvalidRequest(_) => 400,
            ProtocolError::EmptyMessage => 422,
        }
    }

    /// RPC error body: `{ error_code, message }`.
    pub fn to_rpc_error(&self) -> Value {
        json!({
            "error_code": self.code(),
            "message": self.to_string(),
        })
    }

    /// HTTP error body: `{ detail }`.
    pub fn to_http_body(&self) -> Value {
        json!({ "detail": self.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orchestrator_core::error::RoutingError;

    #[test]
    fn orchestrator_error_forwards_status_code() {
        let err = ProtocolError::from(OrchestratorError::from(RoutingError::NoRoute("t-1".into())));
        assert_eq!(err.status_code(), 502);
        assert_eq!(err.code(), "NoRoute");
    }

    #[test]
    fn invalid_request_is_400() {
        let err = ProtocolError::InvalidRequest("message must not be empty".into());
        assert_eq!(err.status_code(), 400);
    }
}

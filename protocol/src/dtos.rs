//! Request/response DTOs for the RPC surface (§6.1). Responses reuse the
//! core domain types directly wherever §6.1's "Output" column names a core
//! type verbatim (e.g. `RoutingDecision`); these structs exist only where
//! the RPC request shape differs from any single core type.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use orchestrator_core::models::{AgentDomain, HealthCheckRecord, HealthStats};

/// `GET /api/agents/{id}/health` response (§6.2): the latest probe result
/// plus the stats the health checker computes on demand from its history.
#[derive(Debug, Clone, Serialize)]
pub struct AgentHealthDoc {
    pub latest: HealthCheckRecord,
    pub stats: HealthStats,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthDoc {
    pub status: &'static str,
    pub version: String,
    pub uptime_seconds: f64,
    pub agents_total: usize,
    pub agents_available: usize,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GetAgentRequest {
    pub agent_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckAgentRequest {
    pub agent_id: String,
    #[serde(default)]
    pub force: bool,
}

/// Request shape for `tasks.route` / `tasks.execute`: a task without its
/// lifecycle fields, which the handler fills in itself.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskRequest {
    pub task_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub domain: Option<AgentDomain>,
    #[serde(default)]
    pub target_agent: Option<String>,
    #[serde(default)]
    pub parameters: HashMap<String, Value>,
    #[serde(default = "default_timeout")]
    pub timeout_seconds: f64,
    #[serde(default)]
    pub max_retries: u32,
}

fn default_timeout() -> f64 {
    30.0
}

#[derive(Debug, Clone, Deserialize)]
pub struct StartWorkflowRequest {
    pub definition: orchestrator_core::models::WorkflowDefinition,
    #[serde(default)]
    pub context: Option<HashMap<String, Value>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionIdRequest {
    pub execution_id: String,
}

/// `POST /api/chat` request body (§6.2).
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub target_agent: Option<String>,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub context: Option<HashMap<String, Value>>,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "response_type", rename_all = "snake_case")]
pub enum ChatResponse {
    Clarification {
        message_id: String,
        question: String,
        options: Vec<String>,
        pending_message_token: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        session_id: Option<String>,
        timestamp: DateTime<Utc>,
    },
    Success {
        message_id: String,
        status: String,
        agent_id: String,
        agent_name: String,
        domain: String,
        response: Value,
        routing_method: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        session_id: Option<String>,
        timestamp: DateTime<Utc>,
    },
}

/// Parses the lowercase domain names accepted by the chat endpoint; any
/// other value is a `400`.
pub fn parse_domain(value: &str) -> Option<AgentDomain> {
    AgentDomain::all()
        .iter()
        .copied()
        .find(|d| d.as_str() == value.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_domain_accepts_known_values() {
        assert_eq!(parse_domain("cmdb"), Some(AgentDomain::Cmdb));
        assert_eq!(parse_domain("CMDB"), Some(AgentDomain::Cmdb));
    }

    #[test]
    fn parse_domain_rejects_unknown_values() {
        assert_eq!(parse_domain("not-a-domain"), None);
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of a single probe against an agent.
#[derive(Debug, Clone, Copy, Hash, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthCheckResult {
    Healthy,
    Degraded,
    Unhealthy,
    Unreachable,
    Skipped,
}

impl HealthCheckResult {
    /// The registry status the checker pushes back after a probe.
    pub fn to_agent_status(self) -> crate::models::agent::AgentStatus {
        use crate::models::agent::AgentStatus;
        match self {
            HealthCheckResult::Healthy => AgentStatus::Online,
            HealthCheckResult::Degraded => AgentStatus::Degraded,
            HealthCheckResult::Unhealthy | HealthCheckResult::Unreachable => AgentStatus::Offline,
            HealthCheckResult::Skipped => AgentStatus::Maintenance,
        }
    }
}

/// One entry in the health checker's bounded rolling history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthCheckRecord {
    pub agent_id: String,
    pub result: HealthCheckResult,
    pub response_time_ms: f64,
    pub timestamp: DateTime<Utc>,
    pub details: String,
}

/// Statistics computed on demand from a slice of [`HealthCheckRecord`].
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct HealthStats {
    pub total_checks: usize,
    pub uptime_percentage: f64,
    pub avg_response_time_ms: f64,
    pub by_result: std::collections::HashMap<String, usize>,
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::routing::RoutingMethod;
use crate::models::task::TaskStatus;

/// One attempt of one task, appended to the executor's bounded history.
///
/// Append-only from the caller's perspective; internally the ring buffer
/// evicts the oldest record once `max_history_records` is exceeded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExecutionRecord {
    pub task_id: String,
    pub agent_id: String,
    pub attempt: u32,
    pub status: TaskStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_seconds: f64,
    pub routing_method: Option<RoutingMethod>,
    pub error_message: Option<String>,
    pub result_summary: Option<String>,
}

/// Statistics computed on demand from the execution history.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ExecutionStats {
    pub total: usize,
    pub success_rate_percent: f64,
    pub mean_duration_seconds: f64,
    pub by_status: std::collections::HashMap<String, usize>,
    pub active_count: usize,
}

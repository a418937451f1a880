use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Relative urgency of a task, consumed by callers for scheduling; the core
/// itself does not reorder tasks by priority.
#[derive(Debug, Clone, Copy, Hash, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Critical,
    High,
    Medium,
    Low,
}

/// Lifecycle status of a task as it moves through routing and execution.
#[derive(Debug, Clone, Copy, Hash, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Routed,
    Executing,
    Completed,
    Failed,
    Cancelled,
    TimedOut,
}

impl TaskStatus {
    /// A status is terminal once no further state transitions occur.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::TimedOut
        )
    }
}

/// One unit of work submitted to the orchestrator.
///
/// Invariants: `retry_count <= max_retries`; `timeout_seconds > 0`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    pub task_id: String,
    pub title: String,
    pub description: String,
    pub domain: Option<crate::models::agent::AgentDomain>,
    pub target_agent: Option<String>,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    #[serde(default)]
    pub parameters: HashMap<String, Value>,
    pub created_at: DateTime<Utc>,
    pub timeout_seconds: f64,
    #[serde(default)]
    pub retry_count: u32,
    #[serde(default)]
    pub max_retries: u32,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

impl Task {
    /// `max_attempts` for the executor's retry loop: one initial attempt plus
    /// `max_retries` retries.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }

    /// Looks up `parameters["context"]["last_agent_id"]`, the session
    /// continuity fallback's data source. Treated as untrusted data only —
    /// never used to bypass role or availability checks.
    pub fn last_agent_id(&self) -> Option<&str> {
        self.parameters
            .get("context")?
            .get("last_agent_id")?
            .as_str()
    }

    pub fn required_capability(&self) -> Option<&str> {
        self.parameters.get("required_capability")?.as_str()
    }

    /// `title` and `description` concatenated for case-insensitive keyword
    /// matching by the router, mirroring `title || " " || description`.
    pub fn searchable_text(&self) -> String {
        format!("{} {}", self.title, self.description)
    }
}

/// Outcome of one terminal attempt at executing a task.
///
/// Invariant: `status` is always terminal; `completed_at >= started_at`;
/// `duration_seconds >= 0`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskResult {
    pub task_id: String,
    pub agent_id: String,
    pub status: TaskStatus,
    #[serde(default)]
    pub result_data: Option<Value>,
    pub error_message: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_seconds: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_task() -> Task {
        Task {
            task_id: "t-1".into(),
            title: "Query CMDB".into(),
            description: "for all linux servers".into(),
            domain: None,
            target_agent: None,
            priority: TaskPriority::Medium,
            status: TaskStatus::Pending,
            parameters: HashMap::new(),
            created_at: Utc::now(),
            timeout_seconds: 30.0,
            retry_count: 0,
            max_retries: 2,
            metadata: HashMap::new(),
        }
    }

    #[test]
    fn max_attempts_is_retries_plus_one() {
        assert_eq!(base_task().max_attempts(), 3);
    }

    #[test]
    fn last_agent_id_reads_nested_context() {
        let mut task = base_task();
        task.parameters.insert(
            "context".into(),
            serde_json::json!({"last_agent_id": "cmdb-agent"}),
        );
        assert_eq!(task.last_agent_id(), Some("cmdb-agent"));
    }

    #[test]
    fn last_agent_id_absent_without_context() {
        assert_eq!(base_task().last_agent_id(), None);
    }

    #[test]
    fn terminal_statuses() {
        assert!(TaskStatus::Completed.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
        assert!(TaskStatus::TimedOut.is_terminal());
        assert!(!TaskStatus::Pending.is_terminal());
        assert!(!TaskStatus::Executing.is_terminal());
    }
}

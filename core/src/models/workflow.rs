use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::agent::AgentDomain;
use crate::models::task::TaskResult;

#[derive(Debug, Clone, Copy, Hash, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowStepType {
    Task,
    Conditional,
    Parallel,
}

/// Policy applied when a step's execution raises.
#[derive(Debug, Clone, Copy, Hash, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OnFailure {
    Stop,
    Skip,
    Retry,
}

#[derive(Debug, Clone, Copy, Hash, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    Pending,
    Running,
    StepExecuting,
    StepCompleted,
    Paused,
    Failed,
    Completed,
    Cancelled,
}

/// One node in a workflow's dependency graph.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkflowStep {
    pub step_id: String,
    pub name: String,
    pub step_type: WorkflowStepType,
    pub agent_domain: Option<AgentDomain>,
    pub target_agent: Option<String>,
    #[serde(default)]
    pub parameters: HashMap<String, Value>,
    #[serde(default)]
    pub depends_on: Vec<String>,
    pub timeout_seconds: f64,
    pub on_failure: OnFailure,
    #[serde(default)]
    pub max_retries: u32,
}

/// An immutable blueprint for a workflow: its steps and their dependency
/// edges. Validated at construction (see
/// [`crate::validation::WorkflowValidator::validate_definition`]).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkflowDefinition {
    pub workflow_id: String,
    pub name: String,
    pub description: String,
    pub version: String,
    pub steps: Vec<WorkflowStep>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

impl WorkflowDefinition {
    pub fn step_ids(&self) -> Vec<String> {
        self.steps.iter().map(|s| s.step_id.clone()).collect()
    }

    pub fn step(&self, step_id: &str) -> Option<&WorkflowStep> {
        self.steps.iter().find(|s| s.step_id == step_id)
    }
}

/// One in-flight instance of a [`WorkflowDefinition`].
///
/// Invariant: `steps_completed` and `steps_remaining` are always disjoint,
/// and their union equals the definition's step set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkflowExecution {
    pub execution_id: String,
    pub workflow_id: String,
    pub status: WorkflowStatus,
    pub current_step_id: Option<String>,
    #[serde(default)]
    pub steps_completed: Vec<String>,
    #[serde(default)]
    pub steps_remaining: Vec<String>,
    #[serde(default)]
    pub step_results: HashMap<String, TaskResult>,
    #[serde(default)]
    pub context: HashMap<String, Value>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
}

impl WorkflowExecution {
    /// Steps whose `depends_on` set is a subset of `steps_completed`.
    pub fn ready_steps(&self, definition: &WorkflowDefinition) -> Vec<String> {
        let completed: std::collections::HashSet<&str> =
            self.steps_completed.iter().map(String::as_str).collect();
        self.steps_remaining
            .iter()
            .filter(|step_id| {
                definition
                    .step(step_id)
                    .map(|step| step.depends_on.iter().all(|dep| completed.contains(dep.as_str())))
                    .unwrap_or(false)
            })
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(id: &str, depends_on: &[&str]) -> WorkflowStep {
        WorkflowStep {
            step_id: id.into(),
            name: id.into(),
            step_type: WorkflowStepType::Task,
            agent_domain: None,
            target_agent: None,
            parameters: HashMap::new(),
            depends_on: depends_on.iter().map(|s| s.to_string()).collect(),
            timeout_seconds: 30.0,
            on_failure: OnFailure::Stop,
            max_retries: 0,
        }
    }

    #[test]
    fn ready_steps_respects_dependencies() {
        let def = WorkflowDefinition {
            workflow_id: "w".into(),
            name: "w".into(),
            description: "".into(),
            version: "1".into(),
            steps: vec![step("s1", &[]), step("s2", &["s1"]), step("s3", &["s2"])],
            created_at: Utc::now(),
            metadata: HashMap::new(),
        };
        let exec = WorkflowExecution {
            execution_id: "e".into(),
            workflow_id: "w".into(),
            status: WorkflowStatus::Running,
            current_step_id: None,
            steps_completed: vec![],
            steps_remaining: def.step_ids(),
            step_results: HashMap::new(),
            context: HashMap::new(),
            started_at: Some(Utc::now()),
            completed_at: None,
            error_message: None,
        };
        assert_eq!(exec.ready_steps(&def), vec!["s1".to_string()]);

        let mut exec = exec;
        exec.steps_completed.push("s1".into());
        exec.steps_remaining.retain(|s| s != "s1");
        assert_eq!(exec.ready_steps(&def), vec!["s2".to_string()]);
    }
}

//! Manual, regex-free validation for every model that carries a construction
//! invariant — the same style as the original per-field validators, just
//! collected behind static-method structs instead of model decorators.

use std::collections::HashSet;

use crate::error::{RegistryError, WorkflowError};
use crate::models::agent::AgentRegistration;
use crate::models::task::Task;
use crate::models::workflow::WorkflowDefinition;

/// Validates [`AgentRegistration`] fields.
pub struct AgentValidator;

impl AgentValidator {
    /// `agent_id` must match `^[a-z][a-z0-9-]*$`.
    pub fn validate_agent_id(id: &str) -> Result<(), RegistryError> {
        let mut chars = id.chars();
        let first = chars
            .next()
            .ok_or_else(|| RegistryError::RegistrationInvalid("agent_id must not be empty".into()))?;
        if !first.is_ascii_lowercase() {
            return Err(RegistryError::RegistrationInvalid(format!(
                "agent_id '{id}' must start with a lowercase letter"
            )));
        }
        if !chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-') {
            return Err(RegistryError::RegistrationInvalid(format!(
                "agent_id '{id}' may only contain lowercase letters, digits and hyphens"
            )));
        }
        Ok(())
    }

    pub fn validate_non_empty(field: &str, value: &str) -> Result<(), RegistryError> {
        if value.trim().is_empty() {
            return Err(RegistryError::RegistrationInvalid(format!(
                "field '{field}' must not be empty"
            )));
        }
        Ok(())
    }

    pub fn validate_registration(registration: &AgentRegistration) -> Result<(), RegistryError> {
        Self::validate_agent_id(&registration.agent_id)?;
        Self::validate_non_empty("name", &registration.name)?;
        Self::validate_non_empty("description", &registration.description)?;
        for capability in &registration.capabilities {
            Self::validate_non_empty("capability.name", &capability.name)?;
        }
        Ok(())
    }
}

/// Validates [`Task`] fields.
pub struct TaskValidator;

impl TaskValidator {
    pub fn validate_timeout(timeout_seconds: f64) -> Result<(), String> {
        if timeout_seconds > 0.0 {
            Ok(())
        } else {
            Err(format!(
                "timeout_seconds must be positive, got {timeout_seconds}"
            ))
        }
    }

    pub fn validate_retry_budget(retry_count: u32, max_retries: u32) -> Result<(), String> {
        if retry_count <= max_retries {
            Ok(())
        } else {
            Err(format!(
                "retry_count ({retry_count}) must not exceed max_retries ({max_retries})"
            ))
        }
    }

    pub fn validate_task(task: &Task) -> Result<(), String> {
        Self::validate_timeout(task.timeout_seconds)?;
        Self::validate_retry_budget(task.retry_count, task.max_retries)?;
        if task.title.trim().is_empty() {
            return Err("title must not be empty".into());
        }
        Ok(())
    }
}

/// Validates [`WorkflowDefinition`] construction invariants.
pub struct WorkflowValidator;

impl WorkflowValidator {
    /// Enforces: at least one step; unique step_ids; every `depends_on`
    /// references an existing step_id; no direct self-dependency.
    ///
    /// Deliberately does not detect multi-step cycles — see the Open
    /// Questions entry this mirrors; a cyclic definition is accepted here
    /// and simply never drains `steps_remaining` at runtime.
    pub fn validate_definition(definition: &WorkflowDefinition) -> Result<(), WorkflowError> {
        if definition.steps.is_empty() {
            return Err(WorkflowError::DefinitionInvalid(
                "a workflow definition must have at least one step".into(),
            ));
        }

        let mut seen = HashSet::new();
        for step in &definition.steps {
            if !seen.insert(step.step_id.as_str()) {
                return Err(WorkflowError::DefinitionInvalid(format!(
                    "duplicate step_id '{}'",
                    step.step_id
                )));
            }
        }

        for step in &definition.steps {
            for dep in &step.depends_on {
                if dep == &step.step_id {
                    return Err(WorkflowError::DefinitionInvalid(format!(
                        "step '{}' cannot depend on itself",
                        step.step_id
                    )));
                }
                if !seen.contains(dep.as_str()) {
                    return Err(WorkflowError::DefinitionInvalid(format!(
                        "step '{}' depends on unknown step '{}'",
                        step.step_id, dep
                    )));
                }
            }
            if step.timeout_seconds <= 0.0 {
                return Err(WorkflowError::DefinitionInvalid(format!(
                    "step '{}' timeout_seconds must be positive",
                    step.step_id
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::workflow::{OnFailure, WorkflowStep, WorkflowStepType};
    use chrono::Utc;
    use std::collections::HashMap;

    fn step(id: &str, depends_on: &[&str]) -> WorkflowStep {
        WorkflowStep {
            step_id: id.into(),
            name: id.into(),
            step_type: WorkflowStepType::Task,
            agent_domain: None,
            target_agent: None,
            parameters: HashMap::new(),
            depends_on: depends_on.iter().map(|s| s.to_string()).collect(),
            timeout_seconds: 10.0,
            on_failure: OnFailure::Stop,
            max_retries: 0,
        }
    }

    fn definition(steps: Vec<WorkflowStep>) -> WorkflowDefinition {
        WorkflowDefinition {
            workflow_id: "w".into(),
            name: "w".into(),
            description: "".into(),
            version: "1".into(),
            steps,
            created_at: Utc::now(),
            metadata: HashMap::new(),
        }
    }

    #[test]
    fn valid_agent_ids() {
        assert!(AgentValidator::validate_agent_id("cmdb-agent").is_ok());
        assert!(AgentValidator::validate_agent_id("a").is_ok());
    }

    #[test]
    fn invalid_agent_ids() {
        assert!(AgentValidator::validate_agent_id("").is_err());
        assert!(AgentValidator::validate_agent_id("Cmdb").is_err());
        assert!(AgentValidator::validate_agent_id("1cmdb").is_err());
        assert!(AgentValidator::validate_agent_id("cmdb_agent").is_err());
    }

    #[test]
    fn rejects_empty_definition() {
        assert!(WorkflowValidator::validate_definition(&definition(vec![])).is_err());
    }

    #[test]
    fn rejects_duplicate_step_ids() {
        let def = definition(vec![step("s1", &[]), step("s1", &[])]);
        assert!(WorkflowValidator::validate_definition(&def).is_err());
    }

    #[test]
    fn rejects_self_dependency() {
        let def = definition(vec![step("s1", &["s1"])]);
        assert!(WorkflowValidator::validate_definition(&def).is_err());
    }

    #[test]
    fn rejects_missing_dependency_reference() {
        let def = definition(vec![step("s1", &["ghost"])]);
        assert!(WorkflowValidator::validate_definition(&def).is_err());
    }

    #[test]
    fn accepts_valid_linear_definition() {
        let def = definition(vec![step("s1", &[]), step("s2", &["s1"]), step("s3", &["s2"])]);
        assert!(WorkflowValidator::validate_definition(&def).is_ok());
    }

    #[test]
    fn accepts_multi_step_cycle_per_open_question() {
        let def = definition(vec![step("s1", &["s2"]), step("s2", &["s1"])]);
        assert!(WorkflowValidator::validate_definition(&def).is_ok());
    }
}

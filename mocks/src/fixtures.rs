//! Standard fixtures for consistent testing across the workspace.

use orchestrator_core::models::{
    AgentDomain, AgentRegistration, AgentStatus, OnFailure, Task, TaskPriority, TaskStatus,
    WorkflowDefinition, WorkflowStep, WorkflowStepType,
};

use crate::builders::{AgentRegistrationBuilder, TaskBuilder, WorkflowDefinitionBuilder};

/// A basic CMDB-domain task with sensible defaults.
pub fn create_test_task() -> Task {
    TaskBuilder::new()
        .with_task_id("task-001")
        .with_title("Query CMDB for all Linux servers")
        .with_description("A standard test task with default values")
        .with_domain(AgentDomain::Cmdb)
        .build()
}

/// A task with a specific lifecycle status.
pub fn create_test_task_with_status(status: TaskStatus) -> Task {
    TaskBuilder::new()
        .with_task_id("task-001")
        .with_domain(AgentDomain::Cmdb)
        .with_status(status)
        .build()
}

/// A task explicitly routed to a named agent.
pub fn create_test_task_with_target(agent_id: &str) -> Task {
    TaskBuilder::new()
        .with_task_id("task-001")
        .with_target_agent(agent_id)
        .build()
}

/// One task per priority tier, for exercising priority-sensitive scheduling.
pub fn create_tasks_across_priorities() -> Vec<Task> {
    [
        TaskPriority::Critical,
        TaskPriority::High,
        TaskPriority::Medium,
        TaskPriority::Low,
    ]
    .into_iter()
    .enumerate()
    .map(|(i, priority)| {
        TaskBuilder::new()
            .with_task_id(format!("task-{i:03}"))
            .with_priority(priority)
            .build()
    })
    .collect()
}

/// A single agent registered against the named domain, online and with one
/// matching capability.
pub fn create_test_agent(agent_id: &str, domain: AgentDomain, capability: &str) -> AgentRegistration {
    AgentRegistrationBuilder::new()
        .with_agent_id(agent_id)
        .with_name(agent_id)
        .with_domain(domain)
        .with_capability(capability)
        .build()
}

/// An agent in every [`AgentStatus`], for exercising availability filtering.
pub fn create_agents_in_all_statuses() -> Vec<AgentRegistration> {
    [
        AgentStatus::Online,
        AgentStatus::Offline,
        AgentStatus::Degraded,
        AgentStatus::Maintenance,
    ]
    .into_iter()
    .enumerate()
    .map(|(i, status)| {
        AgentRegistrationBuilder::new()
            .with_agent_id(format!("agent-{i}"))
            .with_domain(AgentDomain::Cmdb)
            .with_status(status)
            .build()
    })
    .collect()
}

/// A single-step workflow definition that runs one CMDB task.
pub fn create_single_step_workflow() -> WorkflowDefinition {
    WorkflowDefinitionBuilder::new()
        .with_workflow_id("workflow-001")
        .with_step(WorkflowStep {
            step_id: "s1".to_string(),
            name: "query cmdb".to_string(),
            step_type: WorkflowStepType::Task,
            agent_domain: Some(AgentDomain::Cmdb),
            target_agent: None,
            parameters: Default::default(),
            depends_on: Vec::new(),
            timeout_seconds: 30.0,
            on_failure: OnFailure::Stop,
            max_retries: 0,
        })
        .build()
}

/// A two-step workflow where `s2` depends on `s1`, for exercising
/// dependency-ordered scheduling.
pub fn create_dependent_step_workflow() -> WorkflowDefinition {
    WorkflowDefinitionBuilder::new()
        .with_workflow_id("workflow-002")
        .with_step(WorkflowStep {
            step_id: "s1".to_string(),
            name: "discover".to_string(),
            step_type: WorkflowStepType::Task,
            agent_domain: Some(AgentDomain::Discovery),
            target_agent: None,
            parameters: Default::default(),
            depends_on: Vec::new(),
            timeout_seconds: 30.0,
            on_failure: OnFailure::Stop,
            max_retries: 0,
        })
        .with_step(WorkflowStep {
            step_id: "s2".to_string(),
            name: "reconcile with cmdb".to_string(),
            step_type: WorkflowStepType::Task,
            agent_domain: Some(AgentDomain::Cmdb),
            target_agent: None,
            parameters: Default::default(),
            depends_on: vec!["s1".to_string()],
            timeout_seconds: 30.0,
            on_failure: OnFailure::Stop,
            max_retries: 0,
        })
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_test_task_is_routable_by_domain() {
        let task = create_test_task();
        assert_eq!(task.domain, Some(AgentDomain::Cmdb));
    }

    #[test]
    fn create_agents_in_all_statuses_covers_every_variant() {
        let agents = create_agents_in_all_statuses();
        assert_eq!(agents.len(), 4);
        assert!(agents.iter().any(|a| a.is_available()));
        assert!(agents.iter().any(|a| !a.is_available()));
    }

    #[test]
    fn create_dependent_step_workflow_orders_steps() {
        let definition = create_dependent_step_workflow();
        assert_eq!(definition.step_ids(), vec!["s1".to_string(), "s2".to_string()]);
    }
}

//! Fluent builders for constructing orchestrator domain values in tests.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde_json::Value;

use orchestrator_core::models::{
    AgentCapability, AgentDomain, AgentRegistration, AgentStatus, OnFailure, Task, TaskPriority,
    TaskStatus, WorkflowDefinition, WorkflowStep, WorkflowStepType,
};

/// Builder for constructing [`Task`] instances in tests.
pub struct TaskBuilder {
    task: Task,
}

impl Default for TaskBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskBuilder {
    pub fn new() -> Self {
        Self {
            task: Task {
                task_id: "task-001".to_string(),
                title: "Test Task".to_string(),
                description: "A test task".to_string(),
                domain: None,
                target_agent: None,
                priority: TaskPriority::Medium,
                status: TaskStatus::Pending,
                parameters: HashMap::new(),
                created_at: Utc::now(),
                timeout_seconds: 30.0,
                retry_count: 0,
                max_retries: 0,
                metadata: HashMap::new(),
            },
        }
    }

    pub fn with_task_id(mut self, task_id: impl Into<String>) -> Self {
        self.task.task_id = task_id.into();
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.task.title = title.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.task.description = description.into();
        self
    }

    pub fn with_domain(mut self, domain: AgentDomain) -> Self {
        self.task.domain = Some(domain);
        self
    }

    pub fn with_target_agent(mut self, agent_id: impl Into<String>) -> Self {
        self.task.target_agent = Some(agent_id.into());
        self
    }

    pub fn with_priority(mut self, priority: TaskPriority) -> Self {
        self.task.priority = priority;
        self
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.task.status = status;
        self
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: Value) -> Self {
        self.task.parameters.insert(key.into(), value);
        self
    }

    pub fn with_timeout_seconds(mut self, timeout_seconds: f64) -> Self {
        self.task.timeout_seconds = timeout_seconds;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.task.max_retries = max_retries;
        self
    }

    pub fn build(self) -> Task {
        self.task
    }
}

/// Builder for constructing [`AgentRegistration`] instances in tests.
pub struct AgentRegistrationBuilder {
    agent: AgentRegistration,
}

impl Default for AgentRegistrationBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentRegistrationBuilder {
    pub fn new() -> Self {
        Self {
            agent: AgentRegistration {
                agent_id: "test-agent".to_string(),
                name: "Test Agent".to_string(),
                description: "An agent used in tests".to_string(),
                domain: AgentDomain::Cmdb,
                capabilities: Vec::new(),
                endpoint: None,
                status: AgentStatus::Online,
                registered_at: Utc::now(),
                last_health_check: None,
                metadata: HashMap::new(),
            },
        }
    }

    pub fn with_agent_id(mut self, agent_id: impl Into<String>) -> Self {
        self.agent.agent_id = agent_id.into();
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.agent.name = name.into();
        self
    }

    pub fn with_domain(mut self, domain: AgentDomain) -> Self {
        self.agent.domain = domain;
        self
    }

    pub fn with_capability(mut self, name: impl Into<String>) -> Self {
        let domain = self.agent.domain;
        self.agent.capabilities.push(AgentCapability {
            name: name.into(),
            domain,
            description: String::new(),
            input_schema: None,
            output_schema: None,
        });
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.agent.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_status(mut self, status: AgentStatus) -> Self {
        self.agent.status = status;
        self
    }

    pub fn with_last_health_check(mut self, timestamp: DateTime<Utc>) -> Self {
        self.agent.last_health_check = Some(timestamp);
        self
    }

    pub fn build(self) -> AgentRegistration {
        self.agent
    }
}

/// Builder for constructing [`WorkflowStep`] instances in tests.
pub struct WorkflowStepBuilder {
    step: WorkflowStep,
}

impl WorkflowStepBuilder {
    pub fn new(step_id: impl Into<String>) -> Self {
        Self {
            step: WorkflowStep {
                step_id: step_id.into(),
                name: "step".to_string(),
                step_type: WorkflowStepType::Task,
                agent_domain: None,
                target_agent: None,
                parameters: HashMap::new(),
                depends_on: Vec::new(),
                timeout_seconds: 30.0,
                on_failure: OnFailure::Stop,
                max_retries: 0,
            },
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.step.name = name.into();
        self
    }

    pub fn with_domain(mut self, domain: AgentDomain) -> Self {
        self.step.agent_domain = Some(domain);
        self
    }

    pub fn with_target_agent(mut self, agent_id: impl Into<String>) -> Self {
        self.step.target_agent = Some(agent_id.into());
        self
    }

    pub fn depends_on(mut self, step_id: impl Into<String>) -> Self {
        self.step.depends_on.push(step_id.into());
        self
    }

    pub fn with_on_failure(mut self, on_failure: OnFailure) -> Self {
        self.step.on_failure = on_failure;
        self
    }

    pub fn build(self) -> WorkflowStep {
        self.step
    }
}

/// Builder for constructing [`WorkflowDefinition`] instances in tests.
pub struct WorkflowDefinitionBuilder {
    definition: WorkflowDefinition,
}

impl Default for WorkflowDefinitionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkflowDefinitionBuilder {
    pub fn new() -> Self {
        Self {
            definition: WorkflowDefinition {
                workflow_id: "workflow-001".to_string(),
                name: "Test Workflow".to_string(),
                description: "A workflow used in tests".to_string(),
                version: "1".to_string(),
                steps: Vec::new(),
                created_at: Utc::now(),
                metadata: HashMap::new(),
            },
        }
    }

    pub fn with_workflow_id(mut self, workflow_id: impl Into<String>) -> Self {
        self.definition.workflow_id = workflow_id.into();
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.definition.name = name.into();
        self
    }

    pub fn with_step(mut self, step: WorkflowStep) -> Self {
        self.definition.steps.push(step);
        self
    }

    pub fn build(self) -> WorkflowDefinition {
        self.definition
    }
}

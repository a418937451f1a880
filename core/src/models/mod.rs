//! Domain model shared by every component: agents, tasks, routing, workflows,
//! health records and execution history.

pub mod agent;
pub mod execution;
pub mod health;
pub mod routing;
pub mod task;
pub mod workflow;

pub use agent::{
    AgentCapability, AgentConfigEntry, AgentDomain, AgentRegistration, AgentStatus,
    RegistrySummary,
};
pub use execution::{ExecutionRecord, ExecutionStats};
pub use health::{HealthCheckRecord, HealthCheckResult, HealthStats};
pub use routing::{
    ClarificationContext, PendingClarification, RoutingDecision, RoutingMethod, RoutingRule,
    RoutingRulesDocument,
};
pub use task::{Task, TaskPriority, TaskResult, TaskStatus};
pub use workflow::{
    OnFailure, WorkflowDefinition, WorkflowExecution, WorkflowStatus, WorkflowStep,
    WorkflowStepType,
};

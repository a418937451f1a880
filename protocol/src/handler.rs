//! The RPC surface (§6.1): one method per row, implemented directly over a
//! composed [`Orchestrator`], transport-agnostic. The HTTP layer in
//! [`crate::server`] is a thin translation of these same methods plus the
//! chat handshake below.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;

use orchestrator_core::models::{
    AgentRegistration, HealthCheckRecord, RoutingDecision, Task, TaskPriority, TaskResult,
    TaskStatus, WorkflowDefinition, WorkflowExecution,
};
use orchestrator_core::router::RouteOptions;
use orchestrator_core::{Orchestrator, OrchestratorError};

use crate::dtos::{parse_domain, AgentHealthDoc, ChatRequest, ChatResponse, HealthDoc, TaskRequest};
use crate::error::ProtocolError;

/// Bridges the RPC surface (and, via [`crate::server`], the HTTP surface)
/// onto a single composed [`Orchestrator`]. One instance per process,
/// shared behind an `Arc`.
#[derive(Clone)]
pub struct OrchestratorHandler {
    orchestrator: Arc<Orchestrator>,
    started_at: DateTime<Utc>,
}

impl OrchestratorHandler {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self {
            orchestrator,
            started_at: Utc::now(),
        }
    }

    fn new_task_id() -> String {
        format!("task-{}", uuid::Uuid::new_v4())
    }

    fn task_from_request(request: TaskRequest) -> Task {
        Task {
            task_id: request.task_id,
            title: request.title,
            description: request.description,
            domain: request.domain,
            target_agent: request.target_agent,
            priority: TaskPriority::Medium,
            status: TaskStatus::Pending,
            parameters: request.parameters,
            created_at: Utc::now(),
            timeout_seconds: request.timeout_seconds,
            retry_count: 0,
            max_retries: request.max_retries,
            metadata: HashMap::new(),
        }
    }

    /// `health` — orchestrator health doc.
    pub async fn health(&self) -> Result<HealthDoc, ProtocolError> {
        let agents = self
            .orchestrator
            .registry
            .list_all()
            .await
            .map_err(OrchestratorError::from)?;
        let uptime_seconds = (Utc::now() - self.started_at).num_milliseconds() as f64 / 1000.0;
        Ok(HealthDoc {
            status: "healthy",
            version: orchestrator_core::VERSION.to_string(),
            uptime_seconds,
            agents_total: agents.len(),
            agents_available: agents.iter().filter(|a| a.is_available()).count(),
            timestamp: Utc::now(),
        })
    }

    /// `agents.list`.
    pub async fn agents_list(&self) -> Result<Vec<AgentRegistration>, ProtocolError> {
        Ok(self
            .orchestrator
            .registry
            .list_all()
            .await
            .map_err(OrchestratorError::from)?)
    }

    /// `agents.get`.
    pub async fn agents_get(&self, agent_id: &str) -> Result<AgentRegistration, ProtocolError> {
        Ok(self
            .orchestrator
            .registry
            .get(agent_id)
            .await
            .map_err(OrchestratorError::from)?)
    }

    /// `agents.check`.
    pub async fn agents_check(
        &self,
        agent_id: &str,
        force: bool,
    ) -> Result<HealthCheckRecord, ProtocolError> {
        Ok(self
            .orchestrator
            .health_checker
            .check_agent(agent_id, force)
            .await
            .map_err(OrchestratorError::from)?)
    }

    /// `GET /api/agents/{id}/health`: the latest probe plus the stats the
    /// health checker computes on demand from its history (§6.2).
    pub async fn agents_health(
        &self,
        agent_id: &str,
        force: bool,
    ) -> Result<AgentHealthDoc, ProtocolError> {
        let latest = self
            .orchestrator
            .health_checker
            .check_agent(agent_id, force)
            .await
            .map_err(OrchestratorError::from)?;
        let stats = self.orchestrator.health_checker.get_agent_health(agent_id).await;
        Ok(AgentHealthDoc { latest, stats })
    }

    /// `tasks.route`.
    pub async fn tasks_route(&self, request: TaskRequest) -> Result<RoutingDecision, ProtocolError> {
        let task = Self::task_from_request(request);
        Ok(self
            .orchestrator
            .router
            .route(&task, RouteOptions::default())
            .await
            .map_err(OrchestratorError::from)?)
    }

    /// `tasks.execute`: routes, then hands the task to the executor.
    pub async fn tasks_execute(&self, request: TaskRequest) -> Result<TaskResult, ProtocolError> {
        let task = Self::task_from_request(request);
        let decision = self
            .orchestrator
            .router
            .route(&task, RouteOptions::default())
            .await
            .map_err(OrchestratorError::from)?;
        Ok(self
            .orchestrator
            .executor
            .execute(&task, &decision)
            .await
            .map_err(OrchestratorError::from)?)
    }

    /// `workflows.start`.
    pub async fn workflows_start(
        &self,
        definition: WorkflowDefinition,
        context: Option<HashMap<String, Value>>,
    ) -> Result<WorkflowExecution, ProtocolError> {
        Ok(self
            .orchestrator
            .workflow_engine
            .start_workflow(definition, context)
            .await
            .map_err(OrchestratorError::from)?)
    }

    /// `workflows.advance`.
    pub async fn workflows_advance(
        &self,
        execution_id: &str,
    ) -> Result<WorkflowExecution, ProtocolError> {
        Ok(self
            .orchestrator
            .workflow_engine
            .advance_workflow(execution_id)
            .await
            .map_err(OrchestratorError::from)?)
    }

    /// `workflows.cancel`.
    pub async fn workflows_cancel(
        &self,
        execution_id: &str,
    ) -> Result<WorkflowExecution, ProtocolError> {
        Ok(self
            .orchestrator
            .workflow_engine
            .cancel_workflow(execution_id)
            .await
            .map_err(OrchestratorError::from)?)
    }

    /// `workflows.get`.
    pub async fn workflows_get(
        &self,
        execution_id: &str,
    ) -> Result<WorkflowExecution, ProtocolError> {
        Ok(self
            .orchestrator
            .workflow_engine
            .get_execution(execution_id)
            .await
            .map_err(OrchestratorError::from)?)
    }

    /// Drives the `POST /api/chat` clarification handshake (§4.4, §6.2):
    /// checks for routing ambiguity first, and only routes + executes the
    /// task when the request is unambiguous.
    pub async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, ProtocolError> {
        if request.message.trim().is_empty() {
            return Err(ProtocolError::EmptyMessage);
        }
        let domain = match &request.domain {
            Some(value) => Some(
                parse_domain(value)
                    .ok_or_else(|| ProtocolError::InvalidRequest(format!("unknown domain: {value}")))?,
            ),
            None => None,
        };

        let mut parameters: HashMap<String, Value> = HashMap::new();
        if let Some(context) = &request.context {
            parameters.insert("context".into(), serde_json::to_value(context).unwrap_or(Value::Null));
        }

        let task = Task {
            task_id: Self::new_task_id(),
            title: request.message.clone(),
            description: String::new(),
            domain,
            target_agent: request.target_agent.clone(),
            priority: TaskPriority::Medium,
            status: TaskStatus::Pending,
            parameters,
            created_at: Utc::now(),
            timeout_seconds: 30.0,
            retry_count: 0,
            max_retries: 0,
            metadata: HashMap::new(),
        };

        if let Some(clarification) = self.orchestrator.router.check_ambiguity(&task).await {
            let token = self
                .orchestrator
                .clarifications
                .insert(request.message.clone(), request.session_id.clone())
                .await;
            return Ok(ChatResponse::Clarification {
                message_id: Self::new_task_id(),
                question: clarification.question,
                options: clarification.options,
                pending_message_token: token,
                session_id: request.session_id,
                timestamp: Utc::now(),
            });
        }

        let decision = self
            .orchestrator
            .router
            .route(&task, RouteOptions::default())
            .await
            .map_err(OrchestratorError::from)?;
        let agent = self
            .orchestrator
            .registry
            .get(&decision.agent)
            .await
            .map_err(OrchestratorError::from)?;
        let result = self
            .orchestrator
            .executor
            .execute(&task, &decision)
            .await
            .map_err(OrchestratorError::from)?;

        Ok(ChatResponse::Success {
            message_id: task.task_id,
            status: status_str(result.status).to_string(),
            agent_id: agent.agent_id,
            agent_name: agent.name,
            domain: agent.domain.as_str().to_string(),
            response: result.result_data.unwrap_or(Value::Null),
            routing_method: method_str(decision.method).to_string(),
            session_id: request.session_id,
            timestamp: Utc::now(),
        })
    }
}

fn status_str(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Pending => "pending",
        TaskStatus::Routed => "routed",
        TaskStatus::Executing => "executing",
        TaskStatus::Completed => "completed",
        TaskStatus::Failed => "failed",
        TaskStatus::Cancelled => "cancelled",
        TaskStatus::TimedOut => "timed_out",
    }
}

fn method_str(method: orchestrator_core::models::RoutingMethod) -> &'static str {
    use orchestrator_core::models::RoutingMethod;
    match method {
        RoutingMethod::Explicit => "explicit",
        RoutingMethod::Rule => "rule",
        RoutingMethod::Domain => "domain",
        RoutingMethod::Capability => "capability",
        RoutingMethod::Session => "session",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orchestrator_core::models::RoutingRule;
    use orchestrator_core::orchestrator::OrchestratorConfig;
    use orchestrator_core::persistence::test_support::InMemoryStore;

    async fn handler() -> OrchestratorHandler {
        let orchestrator = Orchestrator::new(
            Arc::new(InMemoryStore::new()),
            Arc::new(InMemoryStore::new()),
            OrchestratorConfig {
                routing_rules: vec![RoutingRule {
                    name: "cmdb-query".into(),
                    priority: 10,
                    domain: Some(orchestrator_core::models::AgentDomain::Cmdb),
                    keywords: vec!["cmdb".into()],
                    target_agent: None,
                    capability: None,
                }],
                ..OrchestratorConfig::default()
            },
        );
        orchestrator.initialize().await.unwrap();
        OrchestratorHandler::new(Arc::new(orchestrator))
    }

    #[tokio::test]
    async fn health_reports_seeded_agents() {
        let handler = handler().await;
        let doc = handler.health().await.unwrap();
        assert_eq!(doc.agents_total, 6);
        assert_eq!(doc.agents_available, 6);
    }

    #[tokio::test]
    async fn chat_routes_cmdb_query_by_rule() {
        let handler = handler().await;
        let response = handler
            .chat(ChatRequest {
                message: "Query CMDB for all Linux servers".into(),
                target_agent: None,
                domain: None,
                context: None,
                session_id: None,
            })
            .await
            .unwrap();
        match response {
            ChatResponse::Success {
                agent_id,
                routing_method,
                ..
            } => {
                assert_eq!(agent_id, "cmdb-agent");
                assert_eq!(routing_method, "rule");
            }
            other => panic!("expected success, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn chat_rejects_empty_message() {
        let handler = handler().await;
        let err = handler
            .chat(ChatRequest {
                message: "   ".into(),
                target_agent: None,
                domain: None,
                context: None,
                session_id: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ProtocolError::EmptyMessage));
    }

    #[tokio::test]
    async fn chat_emits_clarification_on_ambiguous_domains() {
        let orchestrator = Orchestrator::new(
            Arc::new(InMemoryStore::new()),
            Arc::new(InMemoryStore::new()),
            OrchestratorConfig {
                routing_rules: vec![
                    RoutingRule {
                        name: "cmdb-overlap".into(),
                        priority: 10,
                        domain: Some(orchestrator_core::models::AgentDomain::Cmdb),
                        keywords: vec!["overlap".into()],
                        target_agent: None,
                        capability: None,
                    },
                    RoutingRule {
                        name: "csa-overlap".into(),
                        priority: 10,
                        domain: Some(orchestrator_core::models::AgentDomain::Csa),
                        keywords: vec!["overlap".into()],
                        target_agent: None,
                        capability: None,
                    },
                ],
                ..OrchestratorConfig::default()
            },
        );
        orchestrator.initialize().await.unwrap();
        let handler = OrchestratorHandler::new(Arc::new(orchestrator));

        let response = handler
            .chat(ChatRequest {
                message: "overlap-keyword query".into(),
                target_agent: None,
                domain: None,
                context: None,
                session_id: Some("sess-1".into()),
            })
            .await
            .unwrap();

        match response {
            ChatResponse::Clarification {
                pending_message_token,
                session_id,
                ..
            } => {
                assert_eq!(session_id.as_deref(), Some("sess-1"));
                let pending = handler
                    .orchestrator
                    .clarifications
                    .take(&pending_message_token)
                    .await
                    .unwrap();
                assert_eq!(pending.original_message, "overlap-keyword query");
            }
            other => panic!("expected clarification, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn chat_rejects_unknown_domain() {
        let handler = handler().await;
        let err = handler
            .chat(ChatRequest {
                message: "hello".into(),
                target_agent: None,
                domain: Some("not-a-domain".into()),
                context: None,
                session_id: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn agents_health_includes_latest_record_and_stats() {
        let handler = handler().await;
        let doc = handler.agents_health("cmdb-agent", false).await.unwrap();
        assert_eq!(doc.latest.agent_id, "cmdb-agent");
        assert_eq!(doc.stats.total_checks, 1);
    }
}

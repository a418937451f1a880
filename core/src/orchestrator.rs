//! The composed orchestrator: wires every component together in the
//! dependency order persistence store → registry → health checker → router
//! → executor → workflow engine → checkpointer → clarification store (§2,
//! §5, §9). There is exactly one of these per process; nothing here is a
//! global singleton — callers hold the `Orchestrator` value and share it via
//! `Arc`.

use std::sync::Arc;

use crate::checkpoint::WorkflowCheckpointer;
use crate::clarification::ClarificationStore;
use crate::error::Result;
use crate::executor::{ExecutorConfig, TaskExecutor};
use crate::health::{HealthChecker, HealthCheckerConfig};
use crate::models::RoutingRule;
use crate::persistence::PersistenceStore;
use crate::registry::AgentRegistry;
use crate::router::TaskRouter;
use crate::workflow_engine::WorkflowEngine;

/// Construction-time configuration. The two persistence stores are supplied
/// already rooted at their respective namespaces (`state/` and `workflows/`
/// in the persisted artifact layout, §6.3) — this crate has no opinion on
/// how they are rooted, since the concrete, file-backed `PersistenceStore`
/// lives in the `database` crate to avoid a dependency cycle.
pub struct OrchestratorConfig {
    pub seed_default_agents: bool,
    pub routing_rules: Vec<RoutingRule>,
    pub executor: ExecutorConfig,
    pub health_checker: HealthCheckerConfig,
    pub router_max_history: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            seed_default_agents: true,
            routing_rules: Vec::new(),
            executor: ExecutorConfig::default(),
            health_checker: HealthCheckerConfig::default(),
            router_max_history: 1_000,
        }
    }
}

/// The fully wired orchestrator. Each component holds only the dependencies
/// it needs (an `Arc<AgentRegistry>`, an `Arc<TaskRouter>`, ...) rather than
/// reaching back through this struct, so components remain independently
/// testable in isolation.
pub struct Orchestrator {
    pub registry: Arc<AgentRegistry>,
    pub health_checker: Arc<HealthChecker>,
    pub router: Arc<TaskRouter>,
    pub executor: Arc<TaskExecutor>,
    pub workflow_engine: Arc<WorkflowEngine>,
    pub checkpointer: Arc<WorkflowCheckpointer>,
    pub clarifications: Arc<ClarificationStore>,
}

impl Orchestrator {
    /// Builds every component but does not yet touch persistence; call
    /// [`Orchestrator::initialize`] before serving traffic.
    pub fn new(
        state_store: Arc<dyn PersistenceStore>,
        workflow_store: Arc<dyn PersistenceStore>,
        config: OrchestratorConfig,
    ) -> Self {
        let registry = Arc::new(AgentRegistry::new(
            state_store.clone(),
            config.seed_default_agents,
        ));
        let health_checker = Arc::new(HealthChecker::new(
            registry.clone(),
            state_store.clone(),
            config.health_checker,
        ));
        let router = Arc::new(
            TaskRouter::new(registry.clone(), config.routing_rules)
                .with_max_history(config.router_max_history),
        );
        let executor = Arc::new(TaskExecutor::new(state_store.clone(), config.executor));
        let workflow_engine = Arc::new(WorkflowEngine::new(
            Some(router.clone()),
            Some(executor.clone()),
        ));
        let checkpointer = Arc::new(WorkflowCheckpointer::new(workflow_store));
        let clarifications = Arc::new(ClarificationStore::new());

        Self {
            registry,
            health_checker,
            router,
            executor,
            workflow_engine,
            checkpointer,
            clarifications,
        }
    }

    /// Initializes the registry (loading or seeding agent state) and
    /// rehydrates the executor's and health checker's bounded histories.
    /// Idempotent: safe to call once at process startup.
    pub async fn initialize(&self) -> Result<()> {
        self.registry.initialize().await?;
        self.executor.load_history().await?;
        self.health_checker.load_history().await?;
        Ok(())
    }
}

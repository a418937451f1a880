//! The workflow engine: drives a [`WorkflowDefinition`] forward as a DAG,
//! one `advance` call at a time, merging per-step results into a shared
//! context and honoring per-step failure policies.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::info;

use crate::error::WorkflowError;
use crate::executor::TaskExecutor;
use crate::models::{
    OnFailure, RoutingDecision, RoutingMethod, Task, TaskPriority, TaskResult, TaskStatus,
    WorkflowDefinition, WorkflowExecution, WorkflowStatus, WorkflowStep,
};
use crate::router::{RouteOptions, TaskRouter};
use crate::validation::WorkflowValidator;

/// Generates fresh workflow execution ids. Exists as a seam so tests can
/// inject deterministic ids without calling disallowed nondeterministic
/// APIs (`Uuid::new_v4`-style) from the engine itself.
pub trait ExecutionIdGenerator: Send + Sync {
    fn next_id(&self) -> String;
}

pub struct CounterIdGenerator {
    counter: std::sync::atomic::AtomicU64,
}

impl Default for CounterIdGenerator {
    fn default() -> Self {
        Self {
            counter: std::sync::atomic::AtomicU64::new(1),
        }
    }
}

impl ExecutionIdGenerator for CounterIdGenerator {
    fn next_id(&self) -> String {
        let n = self
            .counter
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        format!("exec-{n}")
    }
}

struct WorkflowEntry {
    definition: WorkflowDefinition,
    execution: WorkflowExecution,
}

pub struct WorkflowEngine {
    router: Option<Arc<TaskRouter>>,
    executor: Option<Arc<TaskExecutor>>,
    id_generator: Arc<dyn ExecutionIdGenerator>,
    executions: RwLock<HashMap<String, WorkflowEntry>>,
}

impl WorkflowEngine {
    pub fn new(router: Option<Arc<TaskRouter>>, executor: Option<Arc<TaskExecutor>>) -> Self {
        Self {
            router,
            executor,
            id_generator: Arc::new(CounterIdGenerator::default()),
            executions: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_id_generator(mut self, id_generator: Arc<dyn ExecutionIdGenerator>) -> Self {
        self.id_generator = id_generator;
        self
    }

    pub async fn start_workflow(
        &self,
        definition: WorkflowDefinition,
        context: Option<HashMap<String, Value>>,
    ) -> Result<WorkflowExecution, WorkflowError> {
        WorkflowValidator::validate_definition(&definition)?;
        let execution = WorkflowExecution {
            execution_id: self.id_generator.next_id(),
            workflow_id: definition.workflow_id.clone(),
            status: WorkflowStatus::Running,
            current_step_id: None,
            steps_completed: Vec::new(),
            steps_remaining: definition.step_ids(),
            step_results: HashMap::new(),
            context: context.unwrap_or_default(),
            started_at: Some(Utc::now()),
            completed_at: None,
            error_message: None,
        };

        let mut executions = self.executions.write().await;
        executions.insert(
            execution.execution_id.clone(),
            WorkflowEntry {
                definition,
                execution: execution.clone(),
            },
        );
        info!(execution_id = %execution.execution_id, "workflow started");
        Ok(execution)
    }

    /// The sole progression operation: synchronous and idempotent when no
    /// steps are ready.
    pub async fn advance_workflow(
        &self,
        execution_id: &str,
    ) -> Result<WorkflowExecution, WorkflowError> {
        let mut executions = self.executions.write().await;
        let entry = executions
            .get_mut(execution_id)
            .ok_or_else(|| WorkflowError::NotFound(execution_id.to_string()))?;

        if !matches!(
            entry.execution.status,
            WorkflowStatus::Running | WorkflowStatus::StepCompleted
        ) {
            return Ok(entry.execution.clone());
        }

        let ready = entry.execution.ready_steps(&entry.definition);
        if ready.is_empty() && entry.execution.steps_remaining.is_empty() {
            entry.execution.status = WorkflowStatus::Completed;
            entry.execution.completed_at = Some(Utc::now());
            return Ok(entry.execution.clone());
        }

        for step_id in ready {
            let step = entry
                .definition
                .step(&step_id)
                .expect("ready step must exist in definition")
                .clone();

            entry.execution.current_step_id = Some(step_id.clone());
            entry.execution.status = WorkflowStatus::StepExecuting;

            match self
                .execute_step(&step, execution_id, &entry.execution)
                .await
            {
                Ok(result) => {
                    entry.execution.steps_completed.push(step_id.clone());
                    entry.execution.steps_remaining.retain(|s| s != &step_id);
                    if let Some(data) = result.result_data.clone() {
                        entry.execution.context.insert(step_id.clone(), data);
                    }
                    entry.execution.step_results.insert(step_id.clone(), result);
                    entry.execution.status = WorkflowStatus::StepCompleted;
                }
                Err(e) => match step.on_failure {
                    OnFailure::Stop => {
                        entry.execution.status = WorkflowStatus::Failed;
                        entry.execution.error_message = Some(e.to_string());
                        entry.execution.completed_at = Some(Utc::now());
                        return Err(WorkflowError::StepFailed(step_id, e.to_string()));
                    }
                    OnFailure::Skip => {
                        let now = Utc::now();
                        let failed_result = TaskResult {
                            task_id: format!("{execution_id}-{step_id}"),
                            agent_id: step.target_agent.clone().unwrap_or_default(),
                            status: TaskStatus::Failed,
                            result_data: None,
                            error_message: Some(e.to_string()),
                            started_at: now,
                            completed_at: now,
                            duration_seconds: 0.0,
                        };
                        entry.execution.steps_completed.push(step_id.clone());
                        entry.execution.steps_remaining.retain(|s| s != &step_id);
                        entry
                            .execution
                            .step_results
                            .insert(step_id.clone(), failed_result);
                        entry.execution.status = WorkflowStatus::StepCompleted;
                    }
                    OnFailure::Retry => {
                        // Retries are delegated entirely to the executor's own
                        // retry loop; there is no additional engine-level retry.
                        entry.execution.status = WorkflowStatus::Failed;
                        entry.execution.error_message = Some(e.to_string());
                        entry.execution.completed_at = Some(Utc::now());
                        return Err(WorkflowError::StepFailed(step_id, e.to_string()));
                    }
                },
            }
        }

        if entry.execution.steps_remaining.is_empty() {
            entry.execution.status = WorkflowStatus::Completed;
            entry.execution.completed_at = Some(Utc::now());
        }

        Ok(entry.execution.clone())
    }

    async fn execute_step(
        &self,
        step: &WorkflowStep,
        execution_id: &str,
        execution: &WorkflowExecution,
    ) -> Result<TaskResult, WorkflowError> {
        let (Some(router), Some(executor)) = (self.router.as_ref(), self.executor.as_ref()) else {
            // No router/executor wired: synthesize a default successful
            // result so the engine remains exercisable in isolation.
            let now = Utc::now();
            return Ok(TaskResult {
                task_id: format!("{execution_id}-{}", step.step_id),
                agent_id: step.target_agent.clone().unwrap_or_else(|| "unwired".into()),
                status: TaskStatus::Completed,
                result_data: Some(Value::Null),
                error_message: None,
                started_at: now,
                completed_at: now,
                duration_seconds: 0.0,
            });
        };

        let mut parameters = step.parameters.clone();
        if !execution.context.is_empty() {
            parameters.insert(
                "context".into(),
                serde_json::to_value(&execution.context).unwrap_or(Value::Null),
            );
        }

        let task = Task {
            task_id: format!("{execution_id}-{}", step.step_id),
            title: step.name.clone(),
            description: format!("workflow step {}", step.step_id),
            domain: step.agent_domain,
            target_agent: step.target_agent.clone(),
            priority: TaskPriority::Medium,
            status: TaskStatus::Pending,
            parameters,
            created_at: Utc::now(),
            timeout_seconds: step.timeout_seconds,
            retry_count: 0,
            max_retries: step.max_retries,
            metadata: HashMap::new(),
        };

        let decision = router
            .route(&task, RouteOptions::default())
            .await
            .unwrap_or(RoutingDecision {
                agent: step.target_agent.clone().unwrap_or_default(),
                reason: "workflow step has no resolvable route".into(),
                method: RoutingMethod::Explicit,
                candidates_evaluated: 0,
                timestamp: Utc::now(),
            });

        executor
            .execute(&task, &decision)
            .await
            .map_err(|e| WorkflowError::StepFailed(step.step_id.clone(), e.to_string()))
    }

    pub async fn cancel_workflow(
        &self,
        execution_id: &str,
    ) -> Result<WorkflowExecution, WorkflowError> {
        let mut executions = self.executions.write().await;
        let entry = executions
            .get_mut(execution_id)
            .ok_or_else(|| WorkflowError::NotFound(execution_id.to_string()))?;
        entry.execution.status = WorkflowStatus::Cancelled;
        entry.execution.current_step_id = None;
        entry.execution.completed_at = Some(Utc::now());
        Ok(entry.execution.clone())
    }

    pub async fn get_execution(
        &self,
        execution_id: &str,
    ) -> Result<WorkflowExecution, WorkflowError> {
        let executions = self.executions.read().await;
        executions
            .get(execution_id)
            .map(|e| e.execution.clone())
            .ok_or_else(|| WorkflowError::NotFound(execution_id.to_string()))
    }

    pub async fn list_executions(
        &self,
        status: Option<WorkflowStatus>,
    ) -> Vec<WorkflowExecution> {
        let executions = self.executions.read().await;
        executions
            .values()
            .map(|e| e.execution.clone())
            .filter(|e| status.map(|s| s == e.status).unwrap_or(true))
            .collect()
    }

    /// Restores an execution loaded from a checkpoint into this engine. The
    /// corresponding definition must be supplied separately (§4.7).
    pub async fn restore_execution(
        &self,
        definition: WorkflowDefinition,
        execution: WorkflowExecution,
    ) {
        let mut executions = self.executions.write().await;
        executions.insert(
            execution.execution_id.clone(),
            WorkflowEntry {
                definition,
                execution,
            },
        );
    }
}

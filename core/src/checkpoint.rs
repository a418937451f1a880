//! The workflow checkpointer: atomic snapshots of a [`WorkflowExecution`]
//! to/from durable storage. Owns nothing itself and does not coordinate
//! with the [`crate::workflow_engine::WorkflowEngine`] — the caller decides
//! when to checkpoint.

use std::sync::Arc;

use crate::error::WorkflowError;
use crate::models::WorkflowExecution;
use crate::persistence::PersistenceStore;

/// Wraps a [`PersistenceStore`] rooted at the checkpoint namespace (the
/// `workflows/` directory in the persisted artifact layout, §6.3) so
/// checkpoint keys are simply execution ids with no prefix collision risk
/// against general orchestrator state.
pub struct WorkflowCheckpointer {
    store: Arc<dyn PersistenceStore>,
}

impl WorkflowCheckpointer {
    pub fn new(store: Arc<dyn PersistenceStore>) -> Self {
        Self { store }
    }

    pub async fn checkpoint(&self, execution: &WorkflowExecution) -> Result<(), WorkflowError> {
        let value = serde_json::to_value(execution)
            .map_err(|e| WorkflowError::CheckpointFailed(e.to_string()))?;
        self.store
            .save(&execution.execution_id, value)
            .await
            .map_err(|e| WorkflowError::CheckpointFailed(e.to_string()))
    }

    pub async fn load(
        &self,
        execution_id: &str,
    ) -> Result<Option<WorkflowExecution>, WorkflowError> {
        let loaded = self
            .store
            .load(execution_id)
            .await
            .map_err(|e| WorkflowError::CheckpointFailed(e.to_string()))?;
        match loaded {
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| WorkflowError::CheckpointFailed(e.to_string())),
            None => Ok(None),
        }
    }

    pub async fn delete(&self, execution_id: &str) -> Result<bool, WorkflowError> {
        self.store
            .delete(execution_id)
            .await
            .map_err(|e| WorkflowError::CheckpointFailed(e.to_string()))
    }

    pub async fn list_checkpoints(&self) -> Result<Vec<String>, WorkflowError> {
        self.store
            .list_keys()
            .await
            .map_err(|e| WorkflowError::CheckpointFailed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WorkflowStatus;
    use crate::persistence::test_support::InMemoryStore;
    use chrono::Utc;
    use std::collections::HashMap;

    fn execution(id: &str) -> WorkflowExecution {
        WorkflowExecution {
            execution_id: id.into(),
            workflow_id: "w".into(),
            status: WorkflowStatus::Running,
            current_step_id: None,
            steps_completed: vec!["s1".into()],
            steps_remaining: vec!["s2".into()],
            step_results: HashMap::new(),
            context: HashMap::new(),
            started_at: Some(Utc::now()),
            completed_at: None,
            error_message: None,
        }
    }

    #[tokio::test]
    async fn checkpoint_round_trips() {
        let checkpointer = WorkflowCheckpointer::new(Arc::new(InMemoryStore::new()));
        let exec = execution("e-1");
        checkpointer.checkpoint(&exec).await.unwrap();
        let loaded = checkpointer.load("e-1").await.unwrap().unwrap();
        assert_eq!(loaded.steps_completed, exec.steps_completed);
        assert_eq!(loaded.status, exec.status);
    }

    #[tokio::test]
    async fn load_absent_checkpoint_returns_none() {
        let checkpointer = WorkflowCheckpointer::new(Arc::new(InMemoryStore::new()));
        assert!(checkpointer.load("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_checkpoints_enumerates_saved_ids() {
        let checkpointer = WorkflowCheckpointer::new(Arc::new(InMemoryStore::new()));
        checkpointer.checkpoint(&execution("e-1")).await.unwrap();
        checkpointer.checkpoint(&execution("e-2")).await.unwrap();
        assert_eq!(checkpointer.list_checkpoints().await.unwrap(), vec!["e-1", "e-2"]);
    }

    #[tokio::test]
    async fn delete_reports_prior_existence() {
        let checkpointer = WorkflowCheckpointer::new(Arc::new(InMemoryStore::new()));
        checkpointer.checkpoint(&execution("e-1")).await.unwrap();
        assert!(checkpointer.delete("e-1").await.unwrap());
        assert!(!checkpointer.delete("e-1").await.unwrap());
    }
}

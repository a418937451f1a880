use thiserror::Error;

/// Result type alias used throughout the orchestrator core.
pub type Result<T> = std::result::Result<T, OrchestratorError>;

/// Failures owned by the [`crate::registry::AgentRegistry`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("agent not found: {0}")]
    NotFound(String),

    #[error("agent already registered: {0}")]
    AlreadyRegistered(String),

    #[error("invalid agent registration: {0}")]
    RegistrationInvalid(String),

    #[error("failed to load registry state: {0}")]
    LoadFailed(String),

    #[error("failed to save registry state: {0}")]
    SaveFailed(String),

    #[error("registry used before initialize()")]
    NotInitialized,
}

impl RegistryError {
    pub fn code(&self) -> &'static str {
        match self {
            RegistryError::NotFound(_) => "AgentNotFound",
            RegistryError::AlreadyRegistered(_) => "AgentAlreadyRegistered",
            RegistryError::RegistrationInvalid(_) => "RegistrationInvalid",
            RegistryError::LoadFailed(_) => "LoadFailed",
            RegistryError::SaveFailed(_) => "SaveFailed",
            RegistryError::NotInitialized => "NotInitialized",
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            RegistryError::NotFound(_) => 404,
            RegistryError::AlreadyRegistered(_) => 409,
            RegistryError::RegistrationInvalid(_) => 400,
            RegistryError::LoadFailed(_) | RegistryError::SaveFailed(_) => 500,
            RegistryError::NotInitialized => 503,
        }
    }
}

/// Failures owned by the [`crate::router::TaskRouter`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RoutingError {
    #[error("no route found for task {0}")]
    NoRoute(String),

    #[error("agent {0} is not available")]
    AgentUnavailable(String),

    #[error("routing is ambiguous for task {0}")]
    AmbiguousRoute(String),

    #[error("invalid routing rule: {0}")]
    RuleInvalid(String),
}

impl RoutingError {
    pub fn code(&self) -> &'static str {
        match self {
            RoutingError::NoRoute(_) => "NoRoute",
            RoutingError::AgentUnavailable(_) => "AgentUnavailable",
            RoutingError::AmbiguousRoute(_) => "AmbiguousRoute",
            RoutingError::RuleInvalid(_) => "RuleInvalid",
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            RoutingError::NoRoute(_) => 502,
            RoutingError::AgentUnavailable(_) => 502,
            RoutingError::AmbiguousRoute(_) => 409,
            RoutingError::RuleInvalid(_) => 400,
        }
    }
}

/// Failures owned by the [`crate::workflow_engine::WorkflowEngine`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("workflow execution not found: {0}")]
    NotFound(String),

    #[error("invalid workflow state transition: {0}")]
    InvalidTransition(String),

    #[error("workflow step '{0}' failed: {1}")]
    StepFailed(String, String),

    #[error("workflow step '{0}' timed out")]
    Timeout(String),

    #[error("failed to checkpoint workflow: {0}")]
    CheckpointFailed(String),

    #[error("invalid workflow definition: {0}")]
    DefinitionInvalid(String),
}

impl WorkflowError {
    pub fn code(&self) -> &'static str {
        match self {
            WorkflowError::NotFound(_) => "NotFound",
            WorkflowError::InvalidTransition(_) => "InvalidTransition",
            WorkflowError::StepFailed(_, _) => "StepFailed",
            WorkflowError::Timeout(_) => "Timeout",
            WorkflowError::CheckpointFailed(_) => "CheckpointFailed",
            WorkflowError::DefinitionInvalid(_) => "DefinitionInvalid",
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            WorkflowError::NotFound(_) => 404,
            WorkflowError::InvalidTransition(_) => 409,
            WorkflowError::StepFailed(_, _) => 422,
            WorkflowError::Timeout(_) => 504,
            WorkflowError::CheckpointFailed(_) => 500,
            WorkflowError::DefinitionInvalid(_) => 400,
        }
    }
}

/// Failures owned by the persistence store (`database` crate implements the
/// store itself; this enum lives in `core` so every component can report
/// persistence failures without a circular dependency).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PersistenceError {
    #[error("invalid state key: {0}")]
    InvalidKey(String),

    #[error("failed to write state for key '{0}': {1}")]
    StateWriteFailed(String, String),

    #[error("failed to read state for key '{0}': {1}")]
    StateReadFailed(String, String),

    #[error("state for key '{0}' is corrupted")]
    StateCorrupted(String),

    #[error("failed to acquire lock for key '{0}'")]
    LockFailed(String),
}

impl PersistenceError {
    pub fn code(&self) -> &'static str {
        match self {
            PersistenceError::InvalidKey(_) => "InvalidKey",
            PersistenceError::StateWriteFailed(_, _) => "StateWriteFailed",
            PersistenceError::StateReadFailed(_, _) => "StateReadFailed",
            PersistenceError::StateCorrupted(_) => "StateCorrupted",
            PersistenceError::LockFailed(_) => "LockFailed",
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            PersistenceError::InvalidKey(_) => 400,
            PersistenceError::StateWriteFailed(_, _) => 500,
            PersistenceError::StateReadFailed(_, _) => 500,
            PersistenceError::StateCorrupted(_) => 500,
            PersistenceError::LockFailed(_) => 503,
        }
    }
}

/// Failures owned by the [`crate::executor::TaskExecutor`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecutorError {
    #[error("task {0} timed out after {1} attempt(s)")]
    TaskTimeout(String, u32),

    #[error("task {0} exhausted {1} retr(ies): {2}")]
    TaskRetryExhausted(String, u32, String),

    #[error("invalid task: {0}")]
    TaskInvalid(String),
}

impl ExecutorError {
    pub fn code(&self) -> &'static str {
        match self {
            ExecutorError::TaskTimeout(_, _) => "TaskTimeout",
            ExecutorError::TaskRetryExhausted(_, _, _) => "TaskRetryExhausted",
            ExecutorError::TaskInvalid(_) => "TaskInvalid",
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            ExecutorError::TaskTimeout(_, _) => 504,
            ExecutorError::TaskRetryExhausted(_, _, _) => 502,
            ExecutorError::TaskInvalid(_) => 400,
        }
    }
}

/// Crate-wide error aggregating every component family, following the same
/// classification-method idiom as each family enum.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OrchestratorError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Routing(#[from] RoutingError),

    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error(transparent)]
    Executor(#[from] ExecutorError),
}

impl OrchestratorError {
    pub fn code(&self) -> &'static str {
        match self {
            OrchestratorError::Registry(e) => e.code(),
            OrchestratorError::Routing(e) => e.code(),
            OrchestratorError::Workflow(e) => e.code(),
            OrchestratorError::Persistence(e) => e.code(),
            OrchestratorError::Executor(e) => e.code(),
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            OrchestratorError::Registry(e) => e.status_code(),
            OrchestratorError::Routing(e) => e.status_code(),
            OrchestratorError::Workflow(e) => e.status_code(),
            OrchestratorError::Persistence(e) => e.status_code(),
            OrchestratorError::Executor(e) => e.status_code(),
        }
    }
}

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Coarse classification bucket used by the router to match tasks to agents.
#[derive(Debug, Clone, Copy, Hash, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum AgentDomain {
    Cmdb,
    Discovery,
    Asset,
    Csa,
    Audit,
    Documentation,
    Orchestration,
}

impl AgentDomain {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentDomain::Cmdb => "cmdb",
            AgentDomain::Discovery => "discovery",
            AgentDomain::Asset => "asset",
            AgentDomain::Csa => "csa",
            AgentDomain::Audit => "audit",
            AgentDomain::Documentation => "documentation",
            AgentDomain::Orchestration => "orchestration",
        }
    }

    pub fn all() -> &'static [AgentDomain] {
        &[
            AgentDomain::Cmdb,
            AgentDomain::Discovery,
            AgentDomain::Asset,
            AgentDomain::Csa,
            AgentDomain::Audit,
            AgentDomain::Documentation,
            AgentDomain::Orchestration,
        ]
    }
}

impl std::fmt::Display for AgentDomain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lifecycle status of a registered agent.
///
/// Mutated only by the health checker or an explicit operator action; every
/// other field on [`AgentRegistration`] is immutable after registration.
#[derive(Debug, Clone, Copy, Hash, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Online,
    Offline,
    Degraded,
    Maintenance,
}

impl AgentStatus {
    /// An agent is available iff its status is `online` or `degraded`.
    pub fn is_available(&self) -> bool {
        matches!(self, AgentStatus::Online | AgentStatus::Degraded)
    }
}

impl std::fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AgentStatus::Online => "online",
            AgentStatus::Offline => "offline",
            AgentStatus::Degraded => "degraded",
            AgentStatus::Maintenance => "maintenance",
        };
        write!(f, "{s}")
    }
}

/// A single named operation an agent exposes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentCapability {
    pub name: String,
    pub domain: AgentDomain,
    pub description: String,
    pub input_schema: Option<Value>,
    pub output_schema: Option<Value>,
}

/// Canonical record of a downstream agent known to the registry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentRegistration {
    pub agent_id: String,
    pub name: String,
    pub description: String,
    pub domain: AgentDomain,
    pub capabilities: Vec<AgentCapability>,
    pub endpoint: Option<String>,
    pub status: AgentStatus,
    pub registered_at: DateTime<Utc>,
    pub last_health_check: Option<DateTime<Utc>>,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

impl AgentRegistration {
    pub fn is_available(&self) -> bool {
        self.status.is_available()
    }

    pub fn has_capability(&self, name: &str) -> bool {
        self.capabilities.iter().any(|c| c.name == name)
    }
}

/// One entry in the user-editable `agents.json` config surface (see §6.3).
///
/// Distinct from [`AgentRegistration`]: this is the on-disk source of truth
/// an operator edits by hand; it is reconciled into the registry on reload
/// rather than read directly by the router or executor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentConfigEntry {
    pub agent_id: String,
    pub name: String,
    pub description: String,
    pub domain: AgentDomain,
    #[serde(default)]
    pub capabilities: Vec<AgentCapability>,
    pub endpoint: Option<String>,
    pub enabled: bool,
}

/// Aggregate counts returned by [`crate::registry::AgentRegistry::summary`].
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct RegistrySummary {
    pub total_agents: usize,
    pub by_domain: HashMap<String, usize>,
    pub by_status: HashMap<String, usize>,
    pub total_capabilities: usize,
}

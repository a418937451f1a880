//! The agent registry: the canonical, persisted map of `agent_id -> AgentRegistration`.
//!
//! Usable only after [`AgentRegistry::initialize`]; every other operation
//! returns [`RegistryError::NotInitialized`] beforehand. Every mutation
//! persists the full snapshot before returning, so a crash between mutation
//! and persistence is never observable to a subsequent `load`.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::error::RegistryError;
use crate::models::{
    AgentCapability, AgentConfigEntry, AgentDomain, AgentRegistration, AgentStatus,
    RegistrySummary,
};
use crate::persistence::PersistenceStore;
use crate::validation::AgentValidator;

const REGISTRY_KEY: &str = "agent-registry";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct RegistrySnapshot {
    agents: Vec<AgentRegistration>,
}

/// In-memory map of registered agents, mirrored to persistence.
pub struct AgentRegistry {
    store: Arc<dyn PersistenceStore>,
    agents: RwLock<Option<HashMap<String, AgentRegistration>>>,
    seed_defaults: bool,
}

impl AgentRegistry {
    pub fn new(store: Arc<dyn PersistenceStore>, seed_defaults: bool) -> Self {
        Self {
            store,
            agents: RwLock::new(None),
            seed_defaults,
        }
    }

    /// Loads persisted state, or seeds the six baked-in default agents (one
    /// per operational domain other than `orchestration`, which names the
    /// orchestrator itself rather than a downstream agent) when no state is
    /// persisted and `seed_defaults` is enabled. Idempotent: calling twice
    /// after a successful first call is a no-op.
    pub async fn initialize(&self) -> Result<(), RegistryError> {
        {
            let guard = self.agents.read().await;
            if guard.is_some() {
                return Ok(());
            }
        }

        let loaded = self
            .store
            .load(REGISTRY_KEY)
            .await
            .map_err(|e| RegistryError::LoadFailed(e.to_string()))?;

        let (map, should_persist) = match loaded {
            Some(value) => match serde_json::from_value::<RegistrySnapshot>(value) {
                Ok(snapshot) => {
                    let mut map = HashMap::new();
                    for agent in snapshot.agents {
                        map.insert(agent.agent_id.clone(), agent);
                    }
                    (map, false)
                }
                Err(e) => {
                    warn!(error = %e, "agent registry snapshot malformed; starting empty");
                    (HashMap::new(), false)
                }
            },
            None if self.seed_defaults => {
                let mut map = HashMap::new();
                for agent in default_agents() {
                    map.insert(agent.agent_id.clone(), agent);
                }
                (map, true)
            }
            None => (HashMap::new(), false),
        };

        let count = map.len();
        {
            let mut guard = self.agents.write().await;
            *guard = Some(map);
        }
        if should_persist {
            self.persist().await?;
        }
        info!(count, "agent registry initialized");
        Ok(())
    }

    async fn snapshot(&self) -> Result<HashMap<String, AgentRegistration>, RegistryError> {
        let guard = self.agents.read().await;
        guard.clone().ok_or(RegistryError::NotInitialized)
    }

    async fn persist(&self) -> Result<(), RegistryError> {
        let guard = self.agents.read().await;
        let map = guard.as_ref().ok_or(RegistryError::NotInitialized)?;
        let mut agents: Vec<AgentRegistration> = map.values().cloned().collect();
        agents.sort_by(|a, b| a.agent_id.cmp(&b.agent_id));
        let snapshot = RegistrySnapshot { agents };
        let value = serde_json::to_value(&snapshot)
            .map_err(|e| RegistryError::SaveFailed(e.to_string()))?;
        self.store
            .save(REGISTRY_KEY, value)
            .await
            .map_err(|e| RegistryError::SaveFailed(e.to_string()))
    }

    pub async fn register(&self, registration: AgentRegistration) -> Result<(), RegistryError> {
        AgentValidator::validate_registration(&registration)?;
        let mut guard = self.agents.write().await;
        let map = guard.as_mut().ok_or(RegistryError::NotInitialized)?;
        if map.contains_key(&registration.agent_id) {
            return Err(RegistryError::AlreadyRegistered(registration.agent_id));
        }
        map.insert(registration.agent_id.clone(), registration);
        drop(guard);
        self.persist().await
    }

    pub async fn unregister(&self, agent_id: &str) -> Result<(), RegistryError> {
        let mut guard = self.agents.write().await;
        let map = guard.as_mut().ok_or(RegistryError::NotInitialized)?;
        if map.remove(agent_id).is_none() {
            return Err(RegistryError::NotFound(agent_id.to_string()));
        }
        drop(guard);
        self.persist().await
    }

    pub async fn get(&self, agent_id: &str) -> Result<AgentRegistration, RegistryError> {
        let map = self.snapshot().await?;
        map.get(agent_id)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(agent_id.to_string()))
    }

    pub async fn list_all(&self) -> Result<Vec<AgentRegistration>, RegistryError> {
        let map = self.snapshot().await?;
        let mut agents: Vec<_> = map.into_values().collect();
        agents.sort_by(|a, b| a.agent_id.cmp(&b.agent_id));
        Ok(agents)
    }

    pub async fn search_by_domain(
        &self,
        domain: AgentDomain,
    ) -> Result<Vec<AgentRegistration>, RegistryError> {
        let mut agents = self.list_all().await?;
        agents.retain(|a| a.domain == domain);
        Ok(agents)
    }

    pub async fn search_by_capability(
        &self,
        capability: &str,
    ) -> Result<Vec<AgentRegistration>, RegistryError> {
        let mut agents = self.list_all().await?;
        agents.retain(|a| a.has_capability(capability));
        Ok(agents)
    }

    pub async fn search_by_status(
        &self,
        status: AgentStatus,
    ) -> Result<Vec<AgentRegistration>, RegistryError> {
        let mut agents = self.list_all().await?;
        agents.retain(|a| a.status == status);
        Ok(agents)
    }

    /// Copy-on-write status update. The exclusive mutation path for
    /// `AgentRegistration::status` — called by the health checker or an
    /// explicit operator action, never by routing or execution.
    pub async fn update_status(
        &self,
        agent_id: &str,
        new_status: AgentStatus,
        last_health_check: Option<DateTime<Utc>>,
    ) -> Result<AgentRegistration, RegistryError> {
        let mut guard = self.agents.write().await;
        let map = guard.as_mut().ok_or(RegistryError::NotInitialized)?;
        let agent = map
            .get_mut(agent_id)
            .ok_or_else(|| RegistryError::NotFound(agent_id.to_string()))?;
        agent.status = new_status;
        if let Some(ts) = last_health_check {
            agent.last_health_check = Some(ts);
        }
        let updated = agent.clone();
        drop(guard);
        self.persist().await?;
        Ok(updated)
    }

    /// `merge = true` shallow-merges `updates` into the agent's existing
    /// metadata map; `merge = false` replaces it wholesale.
    pub async fn update_metadata(
        &self,
        agent_id: &str,
        updates: HashMap<String, Value>,
        merge: bool,
    ) -> Result<AgentRegistration, RegistryError> {
        let mut guard = self.agents.write().await;
        let map = guard.as_mut().ok_or(RegistryError::NotInitialized)?;
        let agent = map
            .get_mut(agent_id)
            .ok_or_else(|| RegistryError::NotFound(agent_id.to_string()))?;
        if merge {
            for (k, v) in updates {
                agent.metadata.insert(k, v);
            }
        } else {
            agent.metadata = updates;
        }
        let updated = agent.clone();
        drop(guard);
        self.persist().await?;
        Ok(updated)
    }

    /// Flat list of every capability declared by agents in `domain`; no
    /// deduplication across agents.
    pub async fn get_capabilities_for_domain(
        &self,
        domain: AgentDomain,
    ) -> Result<Vec<AgentCapability>, RegistryError> {
        let agents = self.search_by_domain(domain).await?;
        Ok(agents
            .into_iter()
            .flat_map(|a| a.capabilities.into_iter())
            .collect())
    }

    pub async fn summary(&self) -> Result<RegistrySummary, RegistryError> {
        let agents = self.list_all().await?;
        let mut by_domain = HashMap::new();
        let mut by_status = HashMap::new();
        let mut total_capabilities = 0;
        for agent in &agents {
            *by_domain.entry(agent.domain.as_str().to_string()).or_insert(0) += 1;
            *by_status.entry(agent.status.to_string()).or_insert(0) += 1;
            total_capabilities += agent.capabilities.len();
        }
        Ok(RegistrySummary {
            total_agents: agents.len(),
            by_domain,
            by_status,
            total_capabilities,
        })
    }

    /// Diffs `entries` against the in-memory registry by id: enabled
    /// entries absent from the registry are registered; registered agents
    /// whose entry is now `enabled = false` are unregistered; agents present
    /// in both with changed `name`/`description`/`capabilities`/`endpoint`
    /// have those fields updated. Never touches `status`, the health
    /// checker's exclusive province.
    pub async fn reload_from_config(
        &self,
        entries: &[AgentConfigEntry],
    ) -> Result<(), RegistryError> {
        let existing = self.list_all().await?;
        let existing_ids: std::collections::HashSet<&str> =
            existing.iter().map(|a| a.agent_id.as_str()).collect();

        for entry in entries {
            let already_present = existing_ids.contains(entry.agent_id.as_str());
            if entry.enabled && !already_present {
                self.register(AgentRegistration {
                    agent_id: entry.agent_id.clone(),
                    name: entry.name.clone(),
                    description: entry.description.clone(),
                    domain: entry.domain,
                    capabilities: entry.capabilities.clone(),
                    endpoint: entry.endpoint.clone(),
                    status: AgentStatus::Offline,
                    registered_at: Utc::now(),
                    last_health_check: None,
                    metadata: HashMap::new(),
                })
                .await?;
            } else if !entry.enabled && already_present {
                self.unregister(&entry.agent_id).await?;
            } else if entry.enabled && already_present {
                self.reconcile_fields(entry).await?;
            }
        }
        Ok(())
    }

    async fn reconcile_fields(&self, entry: &AgentConfigEntry) -> Result<(), RegistryError> {
        let mut guard = self.agents.write().await;
        let map = guard.as_mut().ok_or(RegistryError::NotInitialized)?;
        let agent = map
            .get_mut(&entry.agent_id)
            .ok_or_else(|| RegistryError::NotFound(entry.agent_id.clone()))?;
        let changed = agent.name != entry.name
            || agent.description != entry.description
            || agent.capabilities != entry.capabilities
            || agent.endpoint != entry.endpoint;
        if changed {
            agent.name = entry.name.clone();
            agent.description = entry.description.clone();
            agent.capabilities = entry.capabilities.clone();
            agent.endpoint = entry.endpoint.clone();
        }
        drop(guard);
        if changed {
            self.persist().await?;
        }
        Ok(())
    }
}

fn default_agents() -> Vec<AgentRegistration> {
    let now = Utc::now();
    let specs: [(&str, &str, AgentDomain, &str); 6] = [
        ("cmdb-agent", "CMDB Agent", AgentDomain::Cmdb, "query"),
        (
            "discovery-agent",
            "Discovery Agent",
            AgentDomain::Discovery,
            "scan",
        ),
        ("asset-agent", "Asset Agent", AgentDomain::Asset, "inventory"),
        ("csa-agent", "CSA Agent", AgentDomain::Csa, "assess"),
        ("audit-agent", "Audit Agent", AgentDomain::Audit, "audit"),
        (
            "documentation-agent",
            "Documentation Agent",
            AgentDomain::Documentation,
            "document",
        ),
    ];
    specs
        .into_iter()
        .map(|(agent_id, name, domain, capability)| AgentRegistration {
            agent_id: agent_id.to_string(),
            name: name.to_string(),
            description: format!("Default {name} for the {domain} domain"),
            domain,
            capabilities: vec![AgentCapability {
                name: capability.to_string(),
                domain,
                description: format!("Default {capability} capability"),
                input_schema: None,
                output_schema: None,
            }],
            endpoint: None,
            status: AgentStatus::Online,
            registered_at: now,
            last_health_check: None,
            metadata: HashMap::new(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::test_support::InMemoryStore;

    fn registration(id: &str, domain: AgentDomain) -> AgentRegistration {
        AgentRegistration {
            agent_id: id.into(),
            name: id.into(),
            description: "test agent".into(),
            domain,
            capabilities: vec![AgentCapability {
                name: "query".into(),
                domain,
                description: "".into(),
                input_schema: None,
                output_schema: None,
            }],
            endpoint: None,
            status: AgentStatus::Online,
            registered_at: Utc::now(),
            last_health_check: None,
            metadata: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn uninitialized_registry_rejects_operations() {
        let registry = AgentRegistry::new(Arc::new(InMemoryStore::new()), false);
        assert!(matches!(
            registry.get("x").await,
            Err(RegistryError::NotInitialized)
        ));
    }

    #[tokio::test]
    async fn empty_registry_without_defaults_has_no_agents() {
        let registry = AgentRegistry::new(Arc::new(InMemoryStore::new()), false);
        registry.initialize().await.unwrap();
        assert_eq!(registry.list_all().await.unwrap(), vec![]);
        assert!(matches!(
            registry.get("cmdb-agent").await,
            Err(RegistryError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn seeds_six_default_agents() {
        let registry = AgentRegistry::new(Arc::new(InMemoryStore::new()), true);
        registry.initialize().await.unwrap();
        let agents = registry.list_all().await.unwrap();
        assert_eq!(agents.len(), 6);
        assert!(agents.iter().all(|a| a.domain != AgentDomain::Orchestration));
    }

    #[tokio::test]
    async fn register_rejects_duplicate_id() {
        let registry = AgentRegistry::new(Arc::new(InMemoryStore::new()), false);
        registry.initialize().await.unwrap();
        registry
            .register(registration("dup", AgentDomain::Cmdb))
            .await
            .unwrap();
        assert!(matches!(
            registry.register(registration("dup", AgentDomain::Cmdb)).await,
            Err(RegistryError::AlreadyRegistered(_))
        ));
    }

    #[tokio::test]
    async fn update_status_persists_and_round_trips() {
        let store = Arc::new(InMemoryStore::new());
        let registry = AgentRegistry::new(store.clone(), false);
        registry.initialize().await.unwrap();
        registry
            .register(registration("a1", AgentDomain::Asset))
            .await
            .unwrap();
        registry
            .update_status("a1", AgentStatus::Degraded, None)
            .await
            .unwrap();

        let reloaded = AgentRegistry::new(store, false);
        reloaded.initialize().await.unwrap();
        assert_eq!(reloaded.get("a1").await.unwrap().status, AgentStatus::Degraded);
    }

    #[tokio::test]
    async fn reload_from_config_adds_updates_and_removes() {
        let registry = AgentRegistry::new(Arc::new(InMemoryStore::new()), false);
        registry.initialize().await.unwrap();
        registry
            .register(registration("stale", AgentDomain::Audit))
            .await
            .unwrap();

        let entries = vec![
            AgentConfigEntry {
                agent_id: "new-agent".into(),
                name: "New Agent".into(),
                description: "added via config".into(),
                domain: AgentDomain::Discovery,
                capabilities: vec![],
                endpoint: None,
                enabled: true,
            },
            AgentConfigEntry {
                agent_id: "stale".into(),
                name: "stale".into(),
                description: "stale".into(),
                domain: AgentDomain::Audit,
                capabilities: vec![],
                endpoint: None,
                enabled: false,
            },
        ];
        registry.reload_from_config(&entries).await.unwrap();

        let agents = registry.list_all().await.unwrap();
        assert!(agents.iter().any(|a| a.agent_id == "new-agent"));
        assert!(!agents.iter().any(|a| a.agent_id == "stale"));
    }
}

//! The health checker: on-demand agent probes, a per-agent TTL cache, and a
//! bounded rolling history (per-agent AND global caps).

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::error::{PersistenceError, RegistryError};
use crate::models::{HealthCheckRecord, HealthCheckResult, HealthStats};
use crate::persistence::PersistenceStore;
use crate::registry::AgentRegistry;

const HISTORY_KEY: &str = "health-history";
const ENDPOINT_NOT_VERIFIED_DETAIL: &str =
    "network reachability is not yet verified for this agent's endpoint";
const NO_CAPABILITIES_DETAIL: &str = "no capabilities declared";

#[derive(Debug, Clone, Copy)]
pub struct HealthCheckerConfig {
    pub cache_ttl_seconds: i64,
    /// Upper bound a future live-network probe must respect; the current
    /// synchronous probe (§4.3) never blocks long enough to need it.
    pub check_timeout_seconds: f64,
    pub max_history_per_agent: usize,
    pub max_total_history: usize,
}

impl Default for HealthCheckerConfig {
    fn default() -> Self {
        Self {
            cache_ttl_seconds: 60,
            check_timeout_seconds: 5.0,
            max_history_per_agent: 100,
            max_total_history: 1_000,
        }
    }
}

struct CacheEntry {
    record: HealthCheckRecord,
}

pub struct HealthChecker {
    registry: Arc<AgentRegistry>,
    store: Arc<dyn PersistenceStore>,
    config: HealthCheckerConfig,
    cache: RwLock<HashMap<String, CacheEntry>>,
    history: RwLock<Vec<HealthCheckRecord>>,
}

impl HealthChecker {
    pub fn new(
        registry: Arc<AgentRegistry>,
        store: Arc<dyn PersistenceStore>,
        config: HealthCheckerConfig,
    ) -> Self {
        Self {
            registry,
            store,
            config,
            cache: RwLock::new(HashMap::new()),
            history: RwLock::new(Vec::new()),
        }
    }

    /// Rehydrates history from persistence. Parse failures reset to empty
    /// with a warning, never aborting startup.
    pub async fn load_history(&self) -> Result<(), PersistenceError> {
        let loaded = self.store.load(HISTORY_KEY).await?;
        let records = match loaded {
            Some(value) => match serde_json::from_value::<Vec<HealthCheckRecord>>(value) {
                Ok(records) => records,
                Err(e) => {
                    warn!(error = %e, "health history malformed; starting empty");
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

    fn probe(endpoint: Option<&str>, capability_count: usize) -> (HealthCheckResult, String) {
        if endpoint.is_some() {
            (
                HealthCheckResult::Degraded,
                ENDPOINT_NOT_VERIFIED_DETAIL.to_string(),
            )
        } else if capability_count > 0 {
            (HealthCheckResult::Healthy, String::new())
        } else {
            (HealthCheckResult::Unhealthy, NO_CAPABILITIES_DETAIL.to_string())
        }
    }

    fn cache_fresh(&self, entry: &CacheEntry, now: DateTime<Utc>) -> bool {
        let age = now - entry.record.timestamp;
        age.num_seconds() < self.config.cache_ttl_seconds
    }

    /// Runs (or returns the cached result for) one agent's probe. Pushes
    /// the result back into the registry via `update_status`.
    pub async fn check_agent(
        &self,
        agent_id: &str,
        force: bool,
    ) -> Result<HealthCheckRecord, RegistryError> {
        let now = Utc::now();
        if !force {
            let cache = self.cache.read().await;
            if let Some(entry) = cache.get(agent_id) {
                if self.cache_fresh(entry, now) {
                    return Ok(entry.record.clone());
                }
            }
        }

        let agent = self.registry.get(agent_id).await?;
        let start = Utc::now();
        let (result, details) = Self::probe(agent.endpoint.as_deref(), agent.capabilities.len());
        let response_time_ms = (Utc::now() - start).num_milliseconds() as f64;

        let record = HealthCheckRecord {
            agent_id: agent_id.to_string(),
            result,
            response_time_ms,
            timestamp: now,
            details,
        };

        self.registry
            .update_status(agent_id, result.to_agent_status(), Some(now))
            .await?;

        self.cache.write().await.insert(
            agent_id.to_string(),
            CacheEntry {
                record: record.clone(),
            },
        );
        self.append_history(record.clone()).await;
        if let Err(e) = self.persist_history().await {
            warn!(error = %e, "failed to persist health history");
        }

        Ok(record)
    }

    async fn append_history(&self, record: HealthCheckRecord) {
        let mut history = self.history.write().await;
        history.push(record);
        if history.len() > self.config.max_total_history {
            let excess = history.len() - self.config.max_total_history;
            history.drain(0..excess);
        }
        // Enforce the per-agent cap by trimming the oldest entries for that
        // agent once it exceeds its own allotment, independent of the
        // global eviction above.
        let agent_id = history.last().map(|r| r.agent_id.clone());
        if let Some(agent_id) = agent_id {
            let count = history.iter().filter(|r| r.agent_id == agent_id).count();
            if count > self.config.max_history_per_agent {
                let mut removed = 0;
                let excess = count - self.config.max_history_per_agent;
                history.retain(|r| {
                    if r.agent_id == agent_id && removed < excess {
                        removed += 1;
                        false
                    } else {
                        true
                    }
                });
            }
        }
    }

    /// Iterates every registered agent, checking each in turn.
    pub async fn check_all(&self, force: bool) -> Result<Vec<HealthCheckRecord>, RegistryError> {
        let agents = self.registry.list_all().await?;
        let mut results = Vec::with_capacity(agents.len());
        for agent in agents {
            results.push(self.check_agent(&agent.agent_id, force).await?);
        }
        info!(count = results.len(), "health check sweep completed");
        Ok(results)
    }

    pub async fn clear_cache(&self, agent_id: Option<&str>) {
        let mut cache = self.cache.write().await;
        match agent_id {
            Some(id) => {
                cache.remove(id);
            }
            None => cache.clear(),
        }
    }

    pub async fn get_history(&self, agent_id: Option<&str>, limit: Option<usize>) -> Vec<HealthCheckRecord> {
        let history = self.history.read().await;
        let mut records: Vec<HealthCheckRecord> = history
            .iter()
            .rev()
            .filter(|r| agent_id.map(|id| r.agent_id == id).unwrap_or(true))
            .cloned()
            .collect();
        if let Some(limit) = limit {
            records.truncate(limit);
        }
        records
    }

    pub async fn get_agent_health(&self, agent_id: &str) -> HealthStats {
        self.compute_stats(Some(agent_id)).await
    }

    pub async fn get_all_health(&self) -> HealthStats {
        self.compute_stats(None).await
    }

    async fn compute_stats(&self, agent_id: Option<&str>) -> HealthStats {
        let history = self.history.read().await;
        let records: Vec<&HealthCheckRecord> = history
            .iter()
            .filter(|r| agent_id.map(|id| r.agent_id == id).unwrap_or(true))
            .collect();

        if records.is_empty() {
            return HealthStats::default();
        }

        let total = records.len();
        let healthy = records
            .iter()
            .filter(|r| r.result == HealthCheckResult::Healthy)
            .count();
        let avg_response_time_ms =
            records.iter().map(|r| r.response_time_ms).sum::<f64>() / total as f64;
        let mut by_result = HashMap::new();
        for record in &records {
            let key = format!("{:?}", record.result).to_lowercase();
            *by_result.entry(key).or_insert(0) += 1;
        }

        HealthStats {
            total_checks: total,
            uptime_percentage: (healthy as f64 / total as f64) * 100.0,
            avg_response_time_ms,
            by_result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AgentCapability, AgentDomain, AgentRegistration, AgentStatus};
    use crate::persistence::test_support::InMemoryStore;
    use std::collections::HashMap as Map;

    async fn registry_with(agent: AgentRegistration) -> Arc<AgentRegistry> {
        let registry = Arc::new(AgentRegistry::new(Arc::new(InMemoryStore::new()), false));
        registry.initialize().await.unwrap();
        registry.register(agent).await.unwrap();
        registry
    }

    fn agent(id: &str, endpoint: Option<&str>, capability: bool) -> AgentRegistration {
        AgentRegistration {
            agent_id: id.into(),
            name: id.into(),
            description: "".into(),
            domain: AgentDomain::Cmdb,
            capabilities: if capability {
                vec![AgentCapability {
                    name: "query".into(),
                    domain: AgentDomain::Cmdb,
                    description: "".into(),
                    input_schema: None,
                    output_schema: None,
                }]
            } else {
                vec![]
            },
            endpoint: endpoint.map(str::to_string),
            status: AgentStatus::Offline,
            registered_at: Utc::now(),
            last_health_check: None,
            metadata: Map::new(),
        }
    }

    #[tokio::test]
    async fn endpoint_agent_is_degraded() {
        let registry = registry_with(agent("e1", Some("https://example.com"), true)).await;
        let checker = HealthChecker::new(
            registry.clone(),
            Arc::new(InMemoryStore::new()),
            HealthCheckerConfig::default(),
        );
        let record = checker.check_agent("e1", false).await.unwrap();
        assert_eq!(record.result, HealthCheckResult::Degraded);
        assert_eq!(registry.get("e1").await.unwrap().status, AgentStatus::Degraded);
    }

    #[tokio::test]
    async fn capability_only_agent_is_healthy() {
        let registry = registry_with(agent("c1", None, true)).await;
        let checker = HealthChecker::new(
            registry.clone(),
            Arc::new(InMemoryStore::new()),
            HealthCheckerConfig::default(),
        );
        let record = checker.check_agent("c1", false).await.unwrap();
        assert_eq!(record.result, HealthCheckResult::Healthy);
        assert_eq!(registry.get("c1").await.unwrap().status, AgentStatus::Online);
    }

    #[tokio::test]
    async fn no_capability_no_endpoint_is_unhealthy() {
        let registry = registry_with(agent("u1", None, false)).await;
        let checker = HealthChecker::new(
            registry.clone(),
            Arc::new(InMemoryStore::new()),
            HealthCheckerConfig::default(),
        );
        let record = checker.check_agent("u1", false).await.unwrap();
        assert_eq!(record.result, HealthCheckResult::Unhealthy);
        assert_eq!(record.details, NO_CAPABILITIES_DETAIL);
        assert_eq!(registry.get("u1").await.unwrap().status, AgentStatus::Offline);
    }

    #[tokio::test]
    async fn cache_is_reused_unless_forced() {
        let registry = registry_with(agent("c1", None, true)).await;
        let checker = HealthChecker::new(
            registry.clone(),
            Arc::new(InMemoryStore::new()),
            HealthCheckerConfig::default(),
        );
        checker.check_agent("c1", false).await.unwrap();
        checker.check_agent("c1", false).await.unwrap();
        assert_eq!(checker.get_history(Some("c1"), None).await.len(), 1);

        checker.check_agent("c1", true).await.unwrap();
        assert_eq!(checker.get_history(Some("c1"), None).await.len(), 2);
    }

    #[tokio::test]
    async fn global_history_cap_evicts_oldest_regardless_of_agent() {
        let registry = Arc::new(AgentRegistry::new(Arc::new(InMemoryStore::new()), false));
        registry.initialize().await.unwrap();
        registry.register(agent("a1", None, true)).await.unwrap();
        registry.register(agent("a2", None, true)).await.unwrap();

        let mut config = HealthCheckerConfig::default();
        config.max_total_history = 3;
        let checker = HealthChecker::new(registry, Arc::new(InMemoryStore::new()), config);

        checker.check_agent("a1", true).await.unwrap();
        checker.check_agent("a2", true).await.unwrap();
        checker.check_agent("a1", true).await.unwrap();
        checker.check_agent("a2", true).await.unwrap();

        assert_eq!(checker.get_history(None, None).await.len(), 3);
    }
}

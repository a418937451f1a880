//! The task router: selects an agent for a task via explicit target, rule
//! sweep, domain match, capability match, or session continuity, and
//! separately detects routing ambiguity for the clarification handshake.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use chrono::Utc;
use tokio::sync::RwLock;

use crate::error::RoutingError;
use crate::models::{
    AgentDomain, AgentRegistration, ClarificationContext, RoutingDecision, RoutingMethod,
    RoutingRule, RoutingRulesDocument, Task,
};
use crate::registry::AgentRegistry;

/// Options governing one `route` call.
#[derive(Debug, Clone, Copy, Default)]
pub struct RouteOptions {
    pub require_available: bool,
}

impl RouteOptions {
    pub fn strict() -> Self {
        Self {
            require_available: true,
        }
    }
}

pub struct TaskRouter {
    registry: Arc<AgentRegistry>,
    rules: RwLock<Vec<RoutingRule>>,
    default_domain: RwLock<Option<AgentDomain>>,
    history: RwLock<Vec<RoutingDecision>>,
    max_history: usize,
    rules_loader: RwLock<Option<RoutingRulesLoader>>,
}

impl TaskRouter {
    pub fn new(registry: Arc<AgentRegistry>, rules: Vec<RoutingRule>) -> Self {
        Self {
            registry,
            rules: RwLock::new(rules),
            default_domain: RwLock::new(None),
            history: RwLock::new(Vec::new()),
            max_history: 1_000,
            rules_loader: RwLock::new(None),
        }
    }

    pub fn with_max_history(mut self, max_history: usize) -> Self {
        self.max_history = max_history;
        self
    }

    pub async fn attach_loader(&self, loader: RoutingRulesLoader) {
        *self.rules_loader.write().await = Some(loader);
    }

    /// Re-validates the rule file (if one is attached and has changed since
    /// it was last loaded) and atomically swaps the rule list. A malformed
    /// file is rejected wholesale; the previously-loaded rules stay live.
    pub async fn reload_rules_if_changed(&self) -> Result<bool, RoutingError> {
        let mut loader_guard = self.rules_loader.write().await;
        let Some(loader) = loader_guard.as_mut() else {
            return Ok(false);
        };
        if !loader.needs_reload() {
            return Ok(false);
        }
        let document = loader.reload()?;
        drop(loader_guard);
        *self.rules.write().await = document.routing_rules;
        *self.default_domain.write().await = document.default_domain;
        Ok(true)
    }

    async fn available_agents(&self) -> Result<Vec<AgentRegistration>, RoutingError> {
        let agents = self
            .registry
            .list_all()
            .await
            .map_err(|e| RoutingError::NoRoute(e.to_string()))?;
        Ok(agents.into_iter().filter(|a| a.is_available()).collect())
    }

    async fn resolve_explicit(
        &self,
        agent_id: &str,
        require_available: bool,
    ) -> Result<AgentRegistration, RoutingError> {
        let agent = self
            .registry
            .get(agent_id)
            .await
            .map_err(|_| RoutingError::NoRoute(agent_id.to_string()))?;
        if require_available && !agent.is_available() {
            return Err(RoutingError::AgentUnavailable(agent_id.to_string()));
        }
        Ok(agent)
    }

    /// Runs the five-step routing algorithm (§4.4) and records the decision
    /// in the in-memory history.
    pub async fn route(
        &self,
        task: &Task,
        options: RouteOptions,
    ) -> Result<RoutingDecision, RoutingError> {
        let decision = self.route_inner(task, options).await?;
        let mut history = self.history.write().await;
        history.push(decision.clone());
        if history.len() > self.max_history {
            let excess = history.len() - self.max_history;
            history.drain(0..excess);
        }
        Ok(decision)
    }

    async fn route_inner(
        &self,
        task: &Task,
        options: RouteOptions,
    ) -> Result<RoutingDecision, RoutingError> {
        let available = self.available_agents().await?;
        let candidates_evaluated = available.len();

        // 1. Explicit target.
        if let Some(target) = &task.target_agent {
            let agent = self
                .resolve_explicit(target, options.require_available)
                .await?;
            return Ok(RoutingDecision {
                agent: agent.agent_id,
                reason: "explicit target_agent requested by caller".into(),
                method: RoutingMethod::Explicit,
                candidates_evaluated,
                timestamp: Utc::now(),
            });
        }

        // 2. Rule sweep, ascending priority.
        let mut rules = self.rules.read().await.clone();
        rules.sort_by_key(|r| r.priority);
        for rule in &rules {
            if !rule.matches(task) {
                continue;
            }
            if let Some(target) = &rule.target_agent {
                match available.iter().find(|a| &a.agent_id == target) {
                    Some(agent) => {
                        return Ok(RoutingDecision {
                            agent: agent.agent_id.clone(),
                            reason: format!("matched rule '{}' (explicit target)", rule.name),
                            method: RoutingMethod::Rule,
                            candidates_evaluated,
                            timestamp: Utc::now(),
                        });
                    }
                    None => continue,
                }
            } else if let Some(domain) = rule.domain {
                if let Some(agent) = first_sorted(&available, |a| a.domain == domain) {
                    return Ok(RoutingDecision {
                        agent: agent.agent_id.clone(),
                        reason: format!("matched rule '{}' (domain {})", rule.name, domain),
                        method: RoutingMethod::Rule,
                        candidates_evaluated,
                        timestamp: Utc::now(),
                    });
                }
            } else if let Some(capability) = &rule.capability {
                if let Some(agent) = first_sorted(&available, |a| a.has_capability(capability)) {
                    return Ok(RoutingDecision {
                        agent: agent.agent_id.clone(),
                        reason: format!("matched rule '{}' (capability {})", rule.name, capability),
                        method: RoutingMethod::Rule,
                        candidates_evaluated,
                        timestamp: Utc::now(),
                    });
                }
            }
        }

        // 3. Domain routing.
        if let Some(domain) = task.domain {
            if let Some(agent) = first_sorted(&available, |a| a.domain == domain) {
                return Ok(RoutingDecision {
                    agent: agent.agent_id.clone(),
                    reason: format!("domain match ({domain})"),
                    method: RoutingMethod::Domain,
                    candidates_evaluated,
                    timestamp: Utc::now(),
                });
            }
        }

        // 4. Capability routing.
        if let Some(capability) = task.required_capability() {
            if let Some(agent) = first_sorted(&available, |a| a.has_capability(capability)) {
                return Ok(RoutingDecision {
                    agent: agent.agent_id.clone(),
                    reason: format!("capability match ({capability})"),
                    method: RoutingMethod::Capability,
                    candidates_evaluated,
                    timestamp: Utc::now(),
                });
            }
        }

        // 5. Session continuity.
        if let Some(last_agent_id) = task.last_agent_id() {
            if let Some(agent) = available.iter().find(|a| a.agent_id == last_agent_id) {
                return Ok(RoutingDecision {
                    agent: agent.agent_id.clone(),
                    reason: "session continuity via parameters.context.last_agent_id".into(),
                    method: RoutingMethod::Session,
                    candidates_evaluated,
                    timestamp: Utc::now(),
                });
            }
        }

        Err(RoutingError::NoRoute(task.task_id.clone()))
    }

    /// A separate query from `route`: computes whether two or more rules
    /// match `task` at the same minimum priority but point to different
    /// domains, without performing any routing side effects.
    pub async fn check_ambiguity(&self, task: &Task) -> Option<ClarificationContext> {
        if task.target_agent.is_some() {
            return None;
        }
        let rules = self.rules.read().await;
        let matches: Vec<(i32, AgentDomain)> = rules
            .iter()
            .filter(|r| r.matches(task))
            .filter_map(|r| r.domain.map(|d| (r.priority, d)))
            .collect();
        if matches.is_empty() {
            return None;
        }
        let min_priority = matches.iter().map(|(p, _)| *p).min().unwrap();
        let mut domains: Vec<AgentDomain> = matches
            .into_iter()
            .filter(|(p, _)| *p == min_priority)
            .map(|(_, d)| d)
            .collect();
        domains.sort();
        domains.dedup();
        if domains.len() < 2 {
            return None;
        }
        let competing_domains: Vec<String> = domains.iter().map(|d| d.as_str().to_string()).collect();
        let (question, options) = clarification_template(&domains);
        Some(ClarificationContext {
            competing_domains,
            question,
            options,
        })
    }

    pub async fn get_routing_history(&self, limit: Option<usize>) -> Vec<RoutingDecision> {
        let history = self.history.read().await;
        let mut decisions: Vec<RoutingDecision> = history.iter().rev().cloned().collect();
        if let Some(limit) = limit {
            decisions.truncate(limit);
        }
        decisions
    }
}

fn first_sorted<'a, F>(agents: &'a [AgentRegistration], predicate: F) -> Option<&'a AgentRegistration>
where
    F: Fn(&AgentRegistration) -> bool,
{
    let mut matching: Vec<&AgentRegistration> = agents.iter().filter(|a| predicate(a)).collect();
    matching.sort_by(|a, b| a.agent_id.cmp(&b.agent_id));
    matching.into_iter().next()
}

/// Looks up a clarification question/options pair keyed by the unordered
/// pair of the first two competing domains, falling back to a generic
/// template when no specific pairing is registered.
fn clarification_template(domains: &[AgentDomain]) -> (String, Vec<String>) {
    let options: Vec<String> = domains.iter().map(|d| d.as_str().to_string()).collect();
    if domains.len() >= 2 {
        let pair = unordered_pair(domains[0], domains[1]);
        if let Some((cmdb, csa)) = pair {
            if (cmdb, csa) == (AgentDomain::Cmdb, AgentDomain::Csa) {
                return (
                    "Did you mean to query the CMDB, or run a CSA assessment?".into(),
                    options,
                );
            }
        }
    }
    (
        format!(
            "This request could apply to multiple domains ({}). Which one did you mean?",
            options.join(", ")
        ),
        options,
    )
}

fn unordered_pair(a: AgentDomain, b: AgentDomain) -> Option<(AgentDomain, AgentDomain)> {
    if a <= b {
        Some((a, b))
    } else {
        Some((b, a))
    }
}

/// Loads and hot-reloads the routing rule configuration document from disk,
/// tracking the source file's modification time so `needs_reload` can
/// report whether it has changed since the rules were last loaded.
pub struct RoutingRulesLoader {
    path: PathBuf,
    last_loaded_mtime: Option<SystemTime>,
}

impl RoutingRulesLoader {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            last_loaded_mtime: None,
        }
    }

    fn current_mtime(&self) -> Option<SystemTime> {
        std::fs::metadata(&self.path).and_then(|m| m.modified()).ok()
    }

    pub fn needs_reload(&self) -> bool {
        match (self.current_mtime(), self.last_loaded_mtime) {
            (Some(current), Some(last)) => current != last,
            (Some(_), None) => true,
            (None, _) => false,
        }
    }

    /// Loads and validates the rule document, rejecting it wholesale on any
    /// structural violation (non-empty `name`, `priority >= 0`, and at
    /// least one of `domain`/`keywords`/`target_agent`/`capability` per
    /// rule).
    pub fn load(&mut self) -> Result<RoutingRulesDocument, RoutingError> {
        let contents = std::fs::read_to_string(&self.path)
            .map_err(|e| RoutingError::RuleInvalid(format!("cannot read rules file: {e}")))?;
        let document: RoutingRulesDocument = serde_json::from_str(&contents)
            .map_err(|e| RoutingError::RuleInvalid(format!("invalid rules document: {e}")))?;
        validate_rules_document(&document)?;
        self.last_loaded_mtime = self.current_mtime();
        Ok(document)
    }

    pub fn reload(&mut self) -> Result<RoutingRulesDocument, RoutingError> {
        self.load()
    }
}

fn validate_rules_document(document: &RoutingRulesDocument) -> Result<(), RoutingError> {
    for rule in &document.routing_rules {
        if rule.name.trim().is_empty() {
            return Err(RoutingError::RuleInvalid("rule name must not be empty".into()));
        }
        if rule.priority < 0 {
            return Err(RoutingError::RuleInvalid(format!(
                "rule '{}' priority must be >= 0",
                rule.name
            )));
        }
        if rule.domain.is_none()
            && rule.keywords.is_empty()
            && rule.target_agent.is_none()
            && rule.capability.is_none()
        {
            return Err(RoutingError::RuleInvalid(format!(
                "rule '{}' must declare at least one of domain/keywords/target_agent/capability",
                rule.name
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        AgentCapability, AgentStatus, TaskPriority, TaskStatus,
    };
    use crate::persistence::test_support::InMemoryStore;
    use chrono::Utc;
    use std::collections::HashMap;

    fn task(title: &str, description: &str, domain: Option<AgentDomain>) -> Task {
        Task {
            task_id: "t-1".into(),
            title: title.into(),
            description: description.into(),
            domain,
            target_agent: None,
            priority: TaskPriority::Medium,
            status: TaskStatus::Pending,
            parameters: HashMap::new(),
            created_at: Utc::now(),
            timeout_seconds: 30.0,
            retry_count: 0,
            max_retries: 0,
            metadata: HashMap::new(),
        }
    }

    fn agent(id: &str, domain: AgentDomain, capability: Option<&str>) -> AgentRegistration {
        AgentRegistration {
            agent_id: id.into(),
            name: id.into(),
            description: "".into(),
            domain,
            capabilities: capability
                .map(|c| {
                    vec![AgentCapability {
                        name: c.into(),
                        domain,
                        description: "".into(),
                        input_schema: None,
                        output_schema: None,
                    }]
                })
                .unwrap_or_default(),
            endpoint: None,
            status: AgentStatus::Online,
            registered_at: Utc::now(),
            last_health_check: None,
            metadata: HashMap::new(),
        }
    }

    async fn registry_with(agents: Vec<AgentRegistration>) -> Arc<AgentRegistry> {
        let registry = Arc::new(AgentRegistry::new(Arc::new(InMemoryStore::new()), false));
        registry.initialize().await.unwrap();
        for a in agents {
            registry.register(a).await.unwrap();
        }
        registry
    }

    #[tokio::test]
    async fn explicit_target_wins_over_everything() {
        let registry = registry_with(vec![
            agent("cmdb-agent", AgentDomain::Cmdb, None),
            agent("discovery-agent", AgentDomain::Discovery, None),
        ])
        .await;
        let router = TaskRouter::new(registry, vec![]);
        let mut t = task("query", "", Some(AgentDomain::Cmdb));
        t.target_agent = Some("discovery-agent".into());
        let decision = router.route(&t, RouteOptions::default()).await.unwrap();
        assert_eq!(decision.agent, "discovery-agent");
        assert_eq!(decision.method, RoutingMethod::Explicit);
    }

    #[tokio::test]
    async fn rule_sweep_routes_by_keyword() {
        let registry = registry_with(vec![agent("cmdb-agent", AgentDomain::Cmdb, None)]).await;
        let rules = vec![RoutingRule {
            name: "cmdb-keyword".into(),
            priority: 10,
            domain: Some(AgentDomain::Cmdb),
            keywords: vec!["cmdb".into()],
            target_agent: None,
            capability: None,
        }];
        let router = TaskRouter::new(registry, rules);
        let t = task("Query CMDB for all Linux servers", "", None);
        let decision = router.route(&t, RouteOptions::default()).await.unwrap();
        assert_eq!(decision.agent, "cmdb-agent");
        assert_eq!(decision.method, RoutingMethod::Rule);
    }

    #[tokio::test]
    async fn tie_break_to_first_sorted_id() {
        let registry = registry_with(vec![
            agent("z-agent", AgentDomain::Cmdb, None),
            agent("a-agent", AgentDomain::Cmdb, None),
        ])
        .await;
        let router = TaskRouter::new(registry, vec![]);
        let t = task("x", "y", Some(AgentDomain::Cmdb));
        let decision = router.route(&t, RouteOptions::default()).await.unwrap();
        assert_eq!(decision.agent, "a-agent");
    }

    #[tokio::test]
    async fn no_route_when_nothing_matches() {
        let registry = registry_with(vec![]).await;
        let router = TaskRouter::new(registry, vec![]);
        let t = task("x", "y", None);
        assert!(matches!(
            router.route(&t, RouteOptions::default()).await,
            Err(RoutingError::NoRoute(_))
        ));
    }

    #[tokio::test]
    async fn ambiguity_detected_for_tied_priority_different_domains() {
        let registry = registry_with(vec![]).await;
        let rules = vec![
            RoutingRule {
                name: "cmdb-overlap".into(),
                priority: 10,
                domain: Some(AgentDomain::Cmdb),
                keywords: vec!["overlap".into()],
                target_agent: None,
                capability: None,
            },
            RoutingRule {
                name: "csa-overlap".into(),
                priority: 10,
                domain: Some(AgentDomain::Csa),
                keywords: vec!["overlap".into()],
                target_agent: None,
                capability: None,
            },
        ];
        let router = TaskRouter::new(registry, rules);
        let t = task("query", "overlap-keyword query", None);
        let clarification = router.check_ambiguity(&t).await.unwrap();
        let mut domains = clarification.competing_domains.clone();
        domains.sort();
        assert_eq!(domains, vec!["cmdb".to_string(), "csa".to_string()]);
    }

    #[tokio::test]
    async fn session_continuity_reuses_last_agent() {
        let registry = registry_with(vec![agent("cmdb-agent", AgentDomain::Cmdb, None)]).await;
        let router = TaskRouter::new(registry, vec![]);
        let mut t = task("x", "y", None);
        t.parameters.insert(
            "context".into(),
            serde_json::json!({"last_agent_id": "cmdb-agent"}),
        );
        let decision = router.route(&t, RouteOptions::default()).await.unwrap();
        assert_eq!(decision.agent, "cmdb-agent");
        assert_eq!(decision.method, RoutingMethod::Session);
    }

    #[tokio::test]
    async fn deterministic_routing_for_identical_inputs() {
        let registry = registry_with(vec![
            agent("b-agent", AgentDomain::Cmdb, None),
            agent("a-agent", AgentDomain::Cmdb, None),
        ])
        .await;
        let router = TaskRouter::new(registry, vec![]);
        let t = task("x", "y", Some(AgentDomain::Cmdb));
        let d1 = router.route(&t, RouteOptions::default()).await.unwrap();
        let d2 = router.route(&t, RouteOptions::default()).await.unwrap();
        assert_eq!(d1.agent, d2.agent);
    }
}

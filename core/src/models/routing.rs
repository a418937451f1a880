use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::agent::AgentDomain;
use crate::models::task::Task;

/// One configured rule the router sweeps in ascending priority order.
///
/// `matches(task)` is true when `domain` equals `task.domain`, OR any
/// `keywords` entry occurs (case-insensitively) as a substring of
/// `task.searchable_text()`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoutingRule {
    pub name: String,
    pub priority: i32,
    pub domain: Option<AgentDomain>,
    #[serde(default)]
    pub keywords: Vec<String>,
    pub target_agent: Option<String>,
    pub capability: Option<String>,
}

impl RoutingRule {
    pub fn matches(&self, task: &Task) -> bool {
        if let Some(domain) = self.domain {
            if task.domain == Some(domain) {
                return true;
            }
        }
        if self.keywords.is_empty() {
            return false;
        }
        let haystack = task.searchable_text().to_lowercase();
        self.keywords
            .iter()
            .any(|kw| !kw.is_empty() && haystack.contains(&kw.to_lowercase()))
    }
}

/// How a [`RoutingDecision`] arrived at its agent.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RoutingMethod {
    Explicit,
    Rule,
    Domain,
    Capability,
    Session,
}

/// The selection of a specific agent for a specific task, with the reason
/// recorded for observability and the testable determinism property (§8.4).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoutingDecision {
    pub agent: String,
    pub reason: String,
    pub method: RoutingMethod,
    pub candidates_evaluated: usize,
    pub timestamp: DateTime<Utc>,
}

/// Emitted when two or more rules match a task at the same minimum priority
/// value but point to different domains.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClarificationContext {
    pub competing_domains: Vec<String>,
    pub question: String,
    pub options: Vec<String>,
}

/// A short-lived, in-memory record of a chat message awaiting clarification.
/// The token is opaque to the client and meaningful only as a lookup key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PendingClarification {
    pub token: String,
    pub original_message: String,
    pub session_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// The optional rule-set configuration surface loaded by
/// `RoutingRulesLoader` (§4.4 supplemental).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoutingRulesDocument {
    pub version: u32,
    #[serde(default)]
    pub domains: Vec<AgentDomain>,
    pub routing_rules: Vec<RoutingRule>,
    #[serde(default)]
    pub capability_mappings: std::collections::HashMap<String, String>,
    pub default_domain: Option<AgentDomain>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::HashMap;

    fn task_with(title: &str, description: &str, domain: Option<AgentDomain>) -> Task {
        Task {
            task_id: "t".into(),
            title: title.into(),
            description: description.into(),
            domain,
            target_agent: None,
            priority: crate::models::task::TaskPriority::Medium,
            status: crate::models::task::TaskStatus::Pending,
            parameters: HashMap::new(),
            created_at: Utc::now(),
            timeout_seconds: 30.0,
            retry_count: 0,
            max_retries: 0,
            metadata: HashMap::new(),
        }
    }

    #[test]
    fn matches_by_domain() {
        let rule = RoutingRule {
            name: "r".into(),
            priority: 1,
            domain: Some(AgentDomain::Cmdb),
            keywords: vec![],
            target_agent: None,
            capability: None,
        };
        assert!(rule.matches(&task_with("x", "y", Some(AgentDomain::Cmdb))));
        assert!(!rule.matches(&task_with("x", "y", Some(AgentDomain::Asset))));
    }

    #[test]
    fn matches_by_keyword_case_insensitive() {
        let rule = RoutingRule {
            name: "r".into(),
            priority: 1,
            domain: None,
            keywords: vec!["CMDB".into()],
            target_agent: None,
            capability: None,
        };
        assert!(rule.matches(&task_with("query cmdb now", "", None)));
        assert!(!rule.matches(&task_with("nothing relevant", "", None)));
    }
}

//! The clarification store: a short-lived, in-memory map of opaque token
//! to pending chat message, used to carry context across the clarification
//! round-trip (§4.4, §9). Purely in-memory — never persisted — and, per the
//! design notes, tokens are never auto-expired by the core; a periodic
//! sweeper remains a documented future addition.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use tokio::sync::RwLock;

use crate::models::PendingClarification;

pub struct ClarificationStore {
    pending: RwLock<HashMap<String, PendingClarification>>,
    counter: AtomicU64,
}

impl Default for ClarificationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ClarificationStore {
    pub fn new() -> Self {
        Self {
            pending: RwLock::new(HashMap::new()),
            counter: AtomicU64::new(1),
        }
    }

    /// Inserts a pending clarification and returns its opaque token.
    pub async fn insert(
        &self,
        original_message: String,
        session_id: Option<String>,
    ) -> String {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        let token = format!("clarify-{n:016x}");
        let entry = PendingClarification {
            token: token.clone(),
            original_message,
            session_id,
            created_at: Utc::now(),
        };
        self.pending.write().await.insert(token.clone(), entry);
        token
    }

    /// Removes and returns the pending clarification for `token`, if any —
    /// the follow-up clarify call consumes the token exactly once.
    pub async fn take(&self, token: &str) -> Option<PendingClarification> {
        self.pending.write().await.remove(token)
    }

    pub async fn peek(&self, token: &str) -> Option<PendingClarification> {
        self.pending.read().await.get(token).cloned()
    }

    pub async fn len(&self) -> usize {
        self.pending.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.pending.read().await.is_empty()
    }
}

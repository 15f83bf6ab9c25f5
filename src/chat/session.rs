//! Per-connection conversation state.
//!
//! One entry per chat connection, keyed by its client id. Only the
//! connection's own handler and the turn tasks it spawned touch an entry,
//! so there is no cross-connection contention; the map exists to let a
//! turn that outlives its connection complete as a stale no-op.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde_json::Value;

/// Conversation continuity for one chat connection.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub client_id: String,
    /// Opaque continuation token from the runtime; replaced after every
    /// completed turn.
    pub chat_context: Option<Value>,
    pub created_at: DateTime<Utc>,
}

#[derive(Default)]
pub struct SessionStore {
    entries: DashMap<String, SessionContext>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_create(&self, client_id: &str) -> SessionContext {
        self.entries
            .entry(client_id.to_string())
            .or_insert_with(|| SessionContext {
                client_id: client_id.to_string(),
                chat_context: None,
                created_at: Utc::now(),
            })
            .clone()
    }

    /// Continuation context for the next turn, if the session still exists.
    pub fn chat_context(&self, client_id: &str) -> Option<Value> {
        self.entries
            .get(client_id)
            .and_then(|entry| entry.chat_context.clone())
    }

    /// Replace the continuation context after a completed turn. A missing
    /// entry means the connection already closed; the update is dropped.
    pub fn update(&self, client_id: &str, chat_context: Option<Value>) {
        if let Some(mut entry) = self.entries.get_mut(client_id) {
            entry.chat_context = chat_context;
        }
    }

    pub fn remove(&self, client_id: &str) {
        self.entries.remove(client_id);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn create_update_and_read_back() {
        let store = SessionStore::new();
        store.get_or_create("client-1");
        assert!(store.chat_context("client-1").is_none());

        store.update("client-1", Some(json!({"turn": 1})));
        assert_eq!(store.chat_context("client-1"), Some(json!({"turn": 1})));
    }

    #[test]
    fn get_or_create_is_stable() {
        let store = SessionStore::new();
        let first = store.get_or_create("client-1");
        store.update("client-1", Some(json!({"turn": 1})));
        let second = store.get_or_create("client-1");
        assert_eq!(first.created_at, second.created_at);
        assert_eq!(second.chat_context, Some(json!({"turn": 1})));
    }

    #[test]
    fn stale_update_after_remove_is_a_no_op() {
        let store = SessionStore::new();
        store.get_or_create("client-1");
        store.remove("client-1");

        // A turn finishing after disconnect must not resurrect the session.
        store.update("client-1", Some(json!({"turn": 2})));
        assert!(store.chat_context("client-1").is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn remove_unknown_is_a_no_op() {
        let store = SessionStore::new();
        store.remove("ghost");
        assert_eq!(store.len(), 0);
    }
}

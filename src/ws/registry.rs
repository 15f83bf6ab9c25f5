//! Registry of per-scope hubs.
//!
//! Guarantees at most one [`ScopeHub`] instance per scope key for the
//! lifetime of the process, so all producers and consumers of the same
//! agent network share buffer and subscriber state. Created lazily on
//! first access, never evicted: scope cardinality is bounded by the number
//! of configured agent networks.

use std::sync::Arc;

use dashmap::DashMap;

use super::hub::ScopeHub;

/// Scope key for the unscoped (process-wide) log feed.
pub const GLOBAL_SCOPE: &str = "global";

pub struct HubRegistry {
    replay_capacity: usize,
    hubs: DashMap<String, Arc<ScopeHub>>,
}

impl HubRegistry {
    pub fn new(replay_capacity: usize) -> Self {
        Self {
            replay_capacity,
            hubs: DashMap::new(),
        }
    }

    /// Return the hub for a scope, creating it on first access. The
    /// check-and-insert is atomic: concurrent first lookups of the same
    /// scope all resolve to one instance.
    pub fn hub(&self, scope: &str) -> Arc<ScopeHub> {
        self.hubs
            .entry(scope.to_string())
            .or_insert_with(|| Arc::new(ScopeHub::new(scope, self.replay_capacity)))
            .clone()
    }

    /// The process-wide log hub.
    pub fn global(&self) -> Arc<ScopeHub> {
        self.hub(GLOBAL_SCOPE)
    }

    pub fn len(&self) -> usize {
        self.hubs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hubs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_scope_returns_same_hub() {
        let registry = HubRegistry::new(10);
        let a = registry.hub("demo");
        let b = registry.hub("demo");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn distinct_scopes_get_distinct_hubs() {
        let registry = HubRegistry::new(10);
        let a = registry.hub("alpha");
        let b = registry.hub("beta");
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(registry.len(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn concurrent_first_access_yields_single_instance() {
        let registry = Arc::new(HubRegistry::new(10));
        let mut handles = Vec::new();
        for _ in 0..50 {
            let registry = registry.clone();
            handles.push(tokio::spawn(async move { registry.hub("racy") }));
        }

        let mut hubs = Vec::new();
        for handle in handles {
            hubs.push(handle.await.unwrap());
        }
        let first = &hubs[0];
        assert!(hubs.iter().all(|hub| Arc::ptr_eq(first, hub)));
        assert_eq!(registry.len(), 1);
    }
}

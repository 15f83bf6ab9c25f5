//! Application state shared across handlers.

use std::sync::Arc;

use crate::chat::SessionStore;
use crate::mesh::{MeshClient, UpstreamConfig};
use crate::ws::HubRegistry;

#[derive(Clone)]
pub struct AppState {
    /// One broadcast hub per scope (agent network or "global").
    pub hubs: Arc<HubRegistry>,
    /// Per-connection conversation state.
    pub sessions: Arc<SessionStore>,
    /// Client handle for the mesh runtime.
    pub mesh: MeshClient,
}

impl AppState {
    pub fn new(upstream: UpstreamConfig, replay_capacity: usize) -> Self {
        Self {
            hubs: Arc::new(HubRegistry::new(replay_capacity)),
            sessions: Arc::new(SessionStore::new()),
            mesh: MeshClient::new(upstream),
        }
    }
}

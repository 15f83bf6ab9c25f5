//! WebSocket fan-out core.
//!
//! This module owns the per-scope broadcast hubs and the socket handlers
//! that face the browser. A "scope" is an agent-network name (or "global"
//! for the unscoped log feed); every producer and subscriber for the same
//! scope shares one [`hub::ScopeHub`] obtained from the
//! [`registry::HubRegistry`].

pub mod chat;
pub mod hub;
pub mod observe;
pub mod registry;
pub mod types;

pub use hub::{Channel, ScopeHub, Subscription};
pub use registry::{GLOBAL_SCOPE, HubRegistry};
pub use types::{ChatCommand, ChatFrame, LogFrame, TraceFrame};

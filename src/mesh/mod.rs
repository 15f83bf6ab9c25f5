//! Mesh runtime boundary.
//!
//! Everything this backend knows about the external agent-orchestration
//! runtime lives here: the generated protocol types, the gRPC client, and
//! the pure helpers that translate between protobuf payloads and the JSON
//! the browser sees.

pub mod client;
pub mod graph;
pub mod proto;
pub mod structconv;

pub use client::{ConnectionType, MeshClient, MeshError, UpstreamConfig};

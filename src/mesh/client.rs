//! gRPC client for the mesh runtime.
//!
//! Connections are per-call: every turn (and every metadata lookup) dials
//! a fresh channel using the endpoint configured at that moment, so the
//! operator can repoint the backend at a different runtime without a
//! restart.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;
use tonic::Streaming;
use tonic::metadata::MetadataValue;
use tonic::transport::{Channel, Endpoint};

use super::proto::agent_service_client::AgentServiceClient;
use super::proto::{
    ChatRequest, ChatResponse, ConnectivityRequest, ConnectivityResponse, ListNetworksRequest,
    ListNetworksResponse,
};

/// Metadata key carrying the target agent-network name on chat streams.
pub const NETWORK_METADATA_KEY: &str = "agent-network";

#[derive(Debug, Error)]
pub enum MeshError {
    #[error("agent runtime unreachable: {0}")]
    Connect(#[from] tonic::transport::Error),

    #[error("agent runtime call failed: {0}")]
    Rpc(#[from] tonic::Status),

    #[error("invalid network name: {0}")]
    Network(#[from] tonic::metadata::errors::InvalidMetadataValue),
}

/// How to reach the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionType {
    #[default]
    Grpc,
    Http,
    Https,
}

/// Runtime endpoint configuration. Replaceable at runtime through the
/// config API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    pub connection_type: ConnectionType,
    pub host: String,
    pub port: u16,
    /// Dial timeout per call.
    pub connect_timeout_secs: u64,
    /// Overall deadline per call, streaming included.
    pub request_timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            connection_type: ConnectionType::Grpc,
            host: "localhost".to_string(),
            port: 30015,
            connect_timeout_secs: 5,
            request_timeout_secs: 120,
        }
    }
}

impl UpstreamConfig {
    pub fn base_url(&self) -> String {
        let scheme = match self.connection_type {
            ConnectionType::Https => "https",
            ConnectionType::Grpc | ConnectionType::Http => "http",
        };
        format!("{scheme}://{}:{}", self.host, self.port)
    }
}

struct ConfigSlot {
    config: UpstreamConfig,
    config_id: u64,
}

/// Client handle for the mesh runtime. Cheap to clone; all clones share
/// the same (mutable) endpoint configuration.
#[derive(Clone)]
pub struct MeshClient {
    slot: Arc<RwLock<ConfigSlot>>,
}

impl MeshClient {
    pub fn new(config: UpstreamConfig) -> Self {
        Self {
            slot: Arc::new(RwLock::new(ConfigSlot {
                config,
                config_id: 1,
            })),
        }
    }

    /// Current endpoint configuration and its generation id.
    pub async fn config(&self) -> (UpstreamConfig, u64) {
        let slot = self.slot.read().await;
        (slot.config.clone(), slot.config_id)
    }

    /// Replace the endpoint configuration. Calls already in flight keep
    /// their existing connection; new calls use the new endpoint.
    pub async fn set_config(&self, config: UpstreamConfig) -> u64 {
        let mut slot = self.slot.write().await;
        slot.config = config;
        slot.config_id += 1;
        slot.config_id
    }

    async fn connect(&self) -> Result<AgentServiceClient<Channel>, MeshError> {
        let config = self.slot.read().await.config.clone();
        let endpoint = Endpoint::from_shared(config.base_url())?
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.request_timeout_secs));
        let channel = endpoint.connect().await?;
        Ok(AgentServiceClient::new(channel))
    }

    /// Open one conversation turn against a named network. The single
    /// request is sent and the send side closed; the returned stream
    /// yields the runtime's response messages in order.
    pub async fn streaming_chat(
        &self,
        network: &str,
        request: ChatRequest,
    ) -> Result<Streaming<ChatResponse>, MeshError> {
        let mut client = self.connect().await?;
        let network_value = MetadataValue::try_from(network)?;
        let mut grpc_request = tonic::Request::new(tokio_stream::once(request));
        grpc_request
            .metadata_mut()
            .insert(NETWORK_METADATA_KEY, network_value);
        Ok(client.streaming_chat(grpc_request).await?.into_inner())
    }

    pub async fn connectivity(&self, network: &str) -> Result<ConnectivityResponse, MeshError> {
        let mut client = self.connect().await?;
        let response = client
            .connectivity(ConnectivityRequest {
                network: network.to_string(),
            })
            .await?;
        Ok(response.into_inner())
    }

    pub async fn list_networks(&self) -> Result<ListNetworksResponse, MeshError> {
        let mut client = self.connect().await?;
        let response = client.list_networks(ListNetworksRequest {}).await?;
        Ok(response.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_scheme_follows_connection_type() {
        let mut config = UpstreamConfig::default();
        assert_eq!(config.base_url(), "http://localhost:30015");

        config.connection_type = ConnectionType::Https;
        config.host = "mesh.example.com".to_string();
        config.port = 443;
        assert_eq!(config.base_url(), "https://mesh.example.com:443");
    }

    #[tokio::test]
    async fn set_config_bumps_generation() {
        let client = MeshClient::new(UpstreamConfig::default());
        let (_, first) = client.config().await;
        let second = client
            .set_config(UpstreamConfig {
                port: 30099,
                ..UpstreamConfig::default()
            })
            .await;
        assert!(second > first);
        let (config, _) = client.config().await;
        assert_eq!(config.port, 30099);
    }
}

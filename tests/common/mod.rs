//! Test utilities and common setup.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use futures::Stream;
use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::{Request, Response, Status, Streaming};

use swarmdeck::api::{AppState, create_router};
use swarmdeck::mesh::proto::agent_service_server::{AgentService, AgentServiceServer};
use swarmdeck::mesh::proto::{
    ChatMessage, ChatMessageType, ChatRequest, ChatResponse, ConnectivityInfo,
    ConnectivityRequest, ConnectivityResponse, ListNetworksRequest, ListNetworksResponse,
    NetworkInfo, Origin,
};
use swarmdeck::mesh::{UpstreamConfig, structconv};

/// Scripted mesh runtime: every chat turn replays the same response
/// sequence and records the requests it saw.
#[derive(Clone, Default)]
pub struct MockMesh {
    pub script: Vec<ChatResponse>,
    pub networks: Vec<NetworkInfo>,
    pub connectivity: Vec<ConnectivityInfo>,
    pub seen_requests: Arc<Mutex<Vec<ChatRequest>>>,
}

#[tonic::async_trait]
impl AgentService for MockMesh {
    type StreamingChatStream = Pin<Box<dyn Stream<Item = Result<ChatResponse, Status>> + Send>>;

    async fn streaming_chat(
        &self,
        request: Request<Streaming<ChatRequest>>,
    ) -> Result<Response<Self::StreamingChatStream>, Status> {
        let mut inbound = request.into_inner();
        while let Some(chat_request) = inbound.message().await? {
            self.seen_requests
                .lock()
                .expect("seen_requests lock")
                .push(chat_request);
        }

        let script = self.script.clone();
        Ok(Response::new(Box::pin(tokio_stream::iter(
            script.into_iter().map(Ok),
        ))))
    }

    async fn connectivity(
        &self,
        _request: Request<ConnectivityRequest>,
    ) -> Result<Response<ConnectivityResponse>, Status> {
        Ok(Response::new(ConnectivityResponse {
            connectivity_info: self.connectivity.clone(),
        }))
    }

    async fn list_networks(
        &self,
        _request: Request<ListNetworksRequest>,
    ) -> Result<Response<ListNetworksResponse>, Status> {
        Ok(Response::new(ListNetworksResponse {
            networks: self.networks.clone(),
        }))
    }
}

/// Start the mock runtime on an ephemeral port.
pub async fn spawn_mesh(mock: MockMesh) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind mesh");
    let addr = listener.local_addr().expect("mesh addr");
    tokio::spawn(async move {
        tonic::transport::Server::builder()
            .add_service(AgentServiceServer::new(mock))
            .serve_with_incoming(TcpListenerStream::new(listener))
            .await
            .expect("mesh server");
    });
    addr
}

pub fn upstream_config(port: u16) -> UpstreamConfig {
    UpstreamConfig {
        host: "127.0.0.1".to_string(),
        port,
        connect_timeout_secs: 2,
        request_timeout_secs: 10,
        ..UpstreamConfig::default()
    }
}

pub fn test_state(upstream_port: u16) -> AppState {
    AppState::new(upstream_config(upstream_port), 100)
}

/// Serve the app router on an ephemeral port.
pub async fn spawn_app(state: AppState) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind app");
    let addr = listener.local_addr().expect("app addr");
    tokio::spawn(async move {
        axum::serve(listener, create_router(state))
            .await
            .expect("app server");
    });
    addr
}

/// A local port nothing is listening on.
pub async fn free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind probe");
    listener.local_addr().expect("probe addr").port()
}

pub fn ai_message(text: &str) -> ChatResponse {
    ChatResponse {
        response: Some(ChatMessage {
            r#type: ChatMessageType::Ai as i32,
            text: text.to_string(),
            origin: Vec::new(),
            chat_context: None,
        }),
    }
}

pub fn ai_message_with_context(text: &str, context: &serde_json::Value) -> ChatResponse {
    ChatResponse {
        response: Some(ChatMessage {
            r#type: ChatMessageType::Ai as i32,
            text: text.to_string(),
            origin: Vec::new(),
            chat_context: structconv::json_to_struct(context),
        }),
    }
}

pub fn agent_message(tools: &[&str], text: &str) -> ChatResponse {
    ChatResponse {
        response: Some(ChatMessage {
            r#type: ChatMessageType::Agent as i32,
            text: text.to_string(),
            origin: tools
                .iter()
                .map(|tool| Origin {
                    tool: tool.to_string(),
                })
                .collect(),
            chat_context: None,
        }),
    }
}

pub fn network_info(name: &str, description: &str) -> NetworkInfo {
    NetworkInfo {
        network: name.to_string(),
        description: description.to_string(),
    }
}

pub fn connectivity_info(origin: &str, tools: &[&str]) -> ConnectivityInfo {
    ConnectivityInfo {
        origin: origin.to_string(),
        tools: tools.iter().map(|tool| tool.to_string()).collect(),
    }
}

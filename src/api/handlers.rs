//! REST handlers.

use axum::{
    Json,
    body::Body,
    extract::{Path, State},
    http::header,
    response::Response,
};
use futures::TryStreamExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::instrument;

use crate::mesh::graph::{self, NetworkGraph};
use crate::mesh::proto::{
    ChatFilter, ChatFilterType, ChatMessage, ChatMessageType, ChatRequest,
};
use crate::mesh::{ConnectionType, UpstreamConfig, structconv};

use super::error::{ApiError, ApiResult};
use super::state::AppState;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct PingResponse {
    pub status: String,
    pub message: String,
}

/// Health check endpoint.
pub async fn ping() -> Json<PingResponse> {
    Json(PingResponse {
        status: "ok".to_string(),
        message: "API is alive".to_string(),
    })
}

#[derive(Debug, Serialize)]
pub struct VersionResponse {
    pub version: String,
}

pub async fn version() -> Json<VersionResponse> {
    Json(VersionResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[derive(Debug, Serialize)]
pub struct NetworksResponse {
    pub networks: Vec<String>,
}

/// List the agent networks available on the mesh runtime.
#[instrument(skip(state))]
pub async fn list_networks(State(state): State<AppState>) -> ApiResult<Json<NetworksResponse>> {
    let response = state.mesh.list_networks().await?;
    Ok(Json(NetworksResponse {
        networks: response
            .networks
            .into_iter()
            .map(|info| info.network)
            .collect(),
    }))
}

/// Node/edge topology graph for one network.
#[instrument(skip(state))]
pub async fn connectivity(
    State(state): State<AppState>,
    Path(network): Path<String>,
) -> ApiResult<Json<NetworkGraph>> {
    let response = state.mesh.connectivity(&network).await?;
    Ok(Json(graph::build_nodes_and_edges(
        &response.connectivity_info,
    )))
}

#[derive(Debug, Serialize)]
pub struct CompactConnectivityEntry {
    pub origin: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct CompactConnectivityResponse {
    pub connectivity: Vec<CompactConnectivityEntry>,
}

/// Raw connectivity passthrough for one network.
#[instrument(skip(state))]
pub async fn compact_connectivity(
    State(state): State<AppState>,
    Path(network): Path<String>,
) -> ApiResult<Json<CompactConnectivityResponse>> {
    let response = state.mesh.connectivity(&network).await?;
    Ok(Json(CompactConnectivityResponse {
        connectivity: response
            .connectivity_info
            .into_iter()
            .map(|info| CompactConnectivityEntry {
                origin: info.origin,
                tools: info.tools,
            })
            .collect(),
    }))
}

#[derive(Debug, Serialize)]
pub struct ConfigResponse {
    pub message: String,
    pub config: UpstreamConfig,
    pub config_id: u64,
}

/// Current mesh runtime endpoint configuration.
pub async fn get_config(State(state): State<AppState>) -> Json<ConfigResponse> {
    let (config, config_id) = state.mesh.config().await;
    Json(ConfigResponse {
        message: "Config retrieved successfully".to_string(),
        config,
        config_id,
    })
}

#[derive(Debug, Deserialize)]
pub struct SetConfigRequest {
    pub connection_type: ConnectionType,
    pub host: String,
    pub port: u16,
}

/// Repoint the backend at a different mesh runtime endpoint. Takes effect
/// for all subsequent calls; in-flight streams keep their connection.
#[instrument(skip(state))]
pub async fn set_config(
    State(state): State<AppState>,
    Json(request): Json<SetConfigRequest>,
) -> ApiResult<Json<ConfigResponse>> {
    if request.host.trim().is_empty() || request.port == 0 {
        return Err(ApiError::bad_request(
            "Missing connectivity type, host or port",
        ));
    }

    let (current, _) = state.mesh.config().await;
    let config = UpstreamConfig {
        connection_type: request.connection_type,
        host: request.host.trim().to_string(),
        port: request.port,
        ..current
    };
    let config_id = state.mesh.set_config(config.clone()).await;

    Ok(Json(ConfigResponse {
        message: "Config updated successfully".to_string(),
        config,
        config_id,
    }))
}

#[derive(Debug, Deserialize)]
pub struct UserMessageModel {
    #[serde(rename = "type", default)]
    pub kind: String,
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct ChatFilterModel {
    pub chat_filter_type: String,
}

/// Body of the pull-style streaming chat endpoint.
#[derive(Debug, Deserialize)]
pub struct ChatRequestModel {
    pub user_message: UserMessageModel,
    #[serde(default)]
    pub sly_data: Option<Value>,
    #[serde(default)]
    pub chat_context: Option<Value>,
    #[serde(default)]
    pub chat_filter: Option<ChatFilterModel>,
}

/// Stateless streaming chat: forwards one request upstream and streams
/// the raw response messages back as JSON lines. No session entry is
/// created and nothing is published to the hubs.
///
/// POST /api/v1/streaming_chat/{network}
#[instrument(skip(state, body))]
pub async fn streaming_chat(
    State(state): State<AppState>,
    Path(network): Path<String>,
    Json(body): Json<ChatRequestModel>,
) -> ApiResult<Response> {
    let chat_filter = match body.chat_filter {
        Some(filter) => Some(ChatFilter {
            chat_filter_type: ChatFilterType::from_str_name(&filter.chat_filter_type)
                .ok_or_else(|| {
                    ApiError::bad_request(format!(
                        "unknown chat_filter_type '{}'",
                        filter.chat_filter_type
                    ))
                })? as i32,
        }),
        None => None,
    };

    let user_type = if body.user_message.kind.is_empty() {
        ChatMessageType::Human
    } else {
        ChatMessageType::from_str_name(&body.user_message.kind).unwrap_or(ChatMessageType::Human)
    };

    let request = ChatRequest {
        user_message: Some(ChatMessage {
            r#type: user_type as i32,
            text: body.user_message.text,
            origin: Vec::new(),
            chat_context: None,
        }),
        sly_data: body.sly_data.as_ref().and_then(structconv::json_to_struct),
        chat_context: body
            .chat_context
            .as_ref()
            .and_then(structconv::json_to_struct),
        chat_filter,
    };

    let stream = state.mesh.streaming_chat(&network, request).await?;
    let lines = stream
        .map_ok(|msg| {
            let mut line = structconv::response_to_json(&msg).to_string();
            line.push('\n');
            axum::body::Bytes::from(line)
        })
        .map_err(axum::Error::new);

    Response::builder()
        .header(header::CONTENT_TYPE, "application/json-lines")
        .body(Body::from_stream(lines))
        .map_err(|err| ApiError::internal(format!("Failed to build streaming response: {err}")))
}

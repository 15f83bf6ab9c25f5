//! One conversation turn against the mesh runtime.
//!
//! `run_turn` owns the upstream stream for its whole lifetime: it opens
//! the call, classifies each message as it arrives, publishes trace/log
//! events to the scope's hub immediately, and returns the turn outcome.
//! Events already published survive a mid-stream failure; observers keep
//! whatever partial trace was produced.

use thiserror::Error;

use crate::mesh::proto::{ChatFilter, ChatFilterType, ChatMessage, ChatMessageType, ChatRequest};
use crate::mesh::{MeshClient, MeshError, structconv};
use crate::ws::hub::ScopeHub;
use crate::ws::types::SOURCE_MESH;

use super::classify::{ClassifiedEvent, TurnClassifier};

#[derive(Debug, Error)]
pub enum TurnError {
    /// The runtime could not be reached or rejected the call before any
    /// message was streamed.
    #[error("agent runtime unavailable: {0}")]
    Unavailable(#[source] MeshError),

    /// The stream failed after partial delivery. Already-published events
    /// remain valid; no final answer is produced.
    #[error("chat stream failed mid-turn: {0}")]
    MidStream(#[source] tonic::Status),
}

/// Input for one turn.
#[derive(Debug, Clone)]
pub struct TurnRequest {
    pub user_text: String,
    pub sly_data: Option<serde_json::Value>,
    pub chat_context: Option<serde_json::Value>,
}

/// Result of a completed turn.
#[derive(Debug, Default)]
pub struct TurnOutcome {
    /// Final answer text, absent when the runtime never produced an AI
    /// message (an observed, non-error outcome).
    pub final_answer: Option<String>,
    /// Last continuation context seen on any message in the stream; the
    /// session's new value even when `None`.
    pub chat_context: Option<serde_json::Value>,
}

pub fn build_chat_request(turn: &TurnRequest) -> ChatRequest {
    ChatRequest {
        user_message: Some(ChatMessage {
            r#type: ChatMessageType::Human as i32,
            text: turn.user_text.clone(),
            origin: Vec::new(),
            chat_context: None,
        }),
        sly_data: turn.sly_data.as_ref().and_then(structconv::json_to_struct),
        chat_context: turn
            .chat_context
            .as_ref()
            .and_then(structconv::json_to_struct),
        chat_filter: Some(ChatFilter {
            chat_filter_type: ChatFilterType::Maximal as i32,
        }),
    }
}

pub async fn run_turn(
    mesh: &MeshClient,
    network: &str,
    request: TurnRequest,
    hub: &ScopeHub,
) -> Result<TurnOutcome, TurnError> {
    let grpc_request = build_chat_request(&request);
    let mut stream = mesh
        .streaming_chat(network, grpc_request)
        .await
        .map_err(TurnError::Unavailable)?;

    let mut classifier = TurnClassifier::new();
    let mut last_context: Option<prost_types::Struct> = None;

    loop {
        match stream.message().await {
            Ok(Some(msg)) => {
                if let Some(response) = msg.response.as_ref() {
                    if let Some(ctx) = response.chat_context.as_ref() {
                        last_context = Some(ctx.clone());
                    }
                }
                for event in classifier.observe(&msg) {
                    match event {
                        ClassifiedEvent::Log { message } => hub.log_event(message, SOURCE_MESH),
                        ClassifiedEvent::Trace(frame) => hub.trace_event(frame),
                    }
                }
            }
            Ok(None) => break,
            Err(status) => return Err(TurnError::MidStream(status)),
        }
    }

    Ok(TurnOutcome {
        final_answer: classifier.finish(),
        chat_context: last_context.as_ref().map(structconv::struct_to_json),
    })
}

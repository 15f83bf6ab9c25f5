//! Chat WebSocket handler.
//!
//! One socket per conversation. Inbound frames are user messages; each
//! non-empty message spawns a turn task against the mesh runtime. The
//! final answer (or an error acknowledgment) comes back one-to-one on
//! this socket, while the turn's trace and log events flow through the
//! shared per-scope hub to any number of observers.
//!
//! Closing the socket does not cancel an in-flight turn: the turn runs to
//! completion headless, its trace/log events still reach other observers,
//! and its final answer is discarded when the send channel is gone.

use axum::{
    extract::{
        Path, State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use log::{debug, info, warn};
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::api::state::AppState;
use crate::chat::{TurnRequest, run_turn};

use super::hub::ScopeHub;
use super::types::{ChatCommand, ChatFrame, SOURCE_BACKEND};

/// Queue size for outbound chat frames on one connection.
const CHAT_FRAME_BUFFER: usize = 16;

/// WebSocket upgrade handler.
///
/// GET /api/v1/ws/chat/{network}
pub async fn chat_ws_handler(
    State(state): State<AppState>,
    Path(network): Path<String>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| handle_chat_connection(socket, state, network))
}

async fn handle_chat_connection(socket: WebSocket, state: AppState, network: String) {
    let client_id = Uuid::new_v4().to_string();
    let hub = state.hubs.hub(&network);

    state.sessions.get_or_create(&client_id);
    hub.log_event(
        format!("Chat client {client_id} connected to network: {network}"),
        SOURCE_BACKEND,
    );

    let (mut sender, mut receiver) = socket.split();
    let (frame_tx, mut frame_rx) = mpsc::channel::<ChatFrame>(CHAT_FRAME_BUFFER);

    // Outbound half: turn tasks push frames here; this task owns the sink.
    let send_task = tokio::spawn(async move {
        while let Some(frame) = frame_rx.recv().await {
            let json = match serde_json::to_string(&frame) {
                Ok(json) => json,
                Err(err) => {
                    warn!("Failed to serialize chat frame: {err}");
                    continue;
                }
            };
            if sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(inbound) = receiver.next().await {
        match inbound {
            Ok(Message::Text(text)) => {
                let command: ChatCommand = match serde_json::from_str(text.as_str()) {
                    Ok(command) => command,
                    Err(err) => {
                        warn!("Unparseable chat command from {client_id}: {err}");
                        continue;
                    }
                };
                if command.message.is_empty() {
                    continue;
                }
                hub.log_event(
                    format!("WebSocket data: {}", command.message),
                    SOURCE_BACKEND,
                );
                spawn_turn(
                    &state,
                    &hub,
                    &network,
                    &client_id,
                    command,
                    frame_tx.clone(),
                );
            }
            Ok(Message::Close(_)) => {
                info!("Chat client {client_id} closed the connection");
                break;
            }
            Ok(_) => {
                debug!("Ignoring non-text frame from chat client {client_id}");
            }
            Err(err) => {
                warn!("Chat socket error for {client_id}: {err}");
                break;
            }
        }
    }

    send_task.abort();
    state.sessions.remove(&client_id);
    hub.log_event(
        format!("Chat client {client_id} disconnected"),
        SOURCE_BACKEND,
    );
}

/// Launch one turn as its own task. The task's completion is handled
/// explicitly in all three shapes: answer delivered, turn failed, or
/// orphaned because the connection is gone (send fails, answer dropped).
fn spawn_turn(
    state: &AppState,
    hub: &Arc<ScopeHub>,
    network: &str,
    client_id: &str,
    command: ChatCommand,
    frame_tx: mpsc::Sender<ChatFrame>,
) {
    let mesh = state.mesh.clone();
    let sessions = state.sessions.clone();
    let hub = hub.clone();
    let network = network.to_string();
    let client_id = client_id.to_string();

    tokio::spawn(async move {
        let request = TurnRequest {
            user_text: command.message,
            sly_data: command.sly_data,
            chat_context: sessions.chat_context(&client_id),
        };

        match run_turn(&mesh, &network, request, &hub).await {
            Ok(outcome) => {
                sessions.update(&client_id, outcome.chat_context);
                if let Some(text) = outcome.final_answer {
                    let frame = ChatFrame::ai(text);
                    let frame_json = serde_json::to_string(&frame).unwrap_or_default();
                    if frame_tx.send(frame).await.is_ok() {
                        hub.log_event(
                            format!("Streaming response sent: {frame_json}"),
                            SOURCE_BACKEND,
                        );
                    } else {
                        debug!("Discarding final answer for disconnected client {client_id}");
                    }
                }
                hub.log_event(
                    format!("Streaming chat finished for client: {client_id}"),
                    SOURCE_BACKEND,
                );
            }
            Err(err) => {
                hub.log_event(
                    format!("Turn failed for client {client_id}: {err}"),
                    SOURCE_BACKEND,
                );
                let _ = frame_tx.send(ChatFrame::error(err.to_string())).await;
            }
        }
    });
}

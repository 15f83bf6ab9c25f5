//! Push-only observer sockets: internal trace and log tails.
//!
//! After the upgrade these sockets only receive: the scope's buffered
//! backlog first, then the live feed. Inbound traffic is ignored except
//! for close detection, which unsubscribes the sink.

use axum::{
    extract::{
        Path, State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use log::warn;
use serde::Serialize;
use std::sync::Arc;

use crate::api::state::AppState;

use super::hub::{Channel, ScopeHub, Subscription};
use super::types::SOURCE_BACKEND;

/// Internal-trace feed for one network.
///
/// GET /api/v1/ws/internalchat/{network}
pub async fn internal_chat_ws_handler(
    State(state): State<AppState>,
    Path(network): Path<String>,
    ws: WebSocketUpgrade,
) -> Response {
    let hub = state.hubs.hub(&network);
    ws.on_upgrade(move |socket| async move {
        let subscription = hub.trace().subscribe();
        hub.log_event("Internal chat client connected", SOURCE_BACKEND);
        pump(socket, hub.trace(), subscription).await;
        hub.log_event("Internal chat client disconnected", SOURCE_BACKEND);
    })
}

/// Log feed for one network.
///
/// GET /api/v1/ws/logs/{network}
pub async fn network_logs_ws_handler(
    State(state): State<AppState>,
    Path(network): Path<String>,
    ws: WebSocketUpgrade,
) -> Response {
    let hub = state.hubs.hub(&network);
    ws.on_upgrade(move |socket| run_logs(socket, hub))
}

/// Process-wide log feed.
///
/// GET /api/v1/ws/logs
pub async fn global_logs_ws_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    let hub = state.hubs.global();
    ws.on_upgrade(move |socket| run_logs(socket, hub))
}

async fn run_logs(socket: WebSocket, hub: Arc<ScopeHub>) {
    let subscription = hub.logs().subscribe();
    hub.log_event("New log client connected", SOURCE_BACKEND);
    pump(socket, hub.logs(), subscription).await;
    hub.log_event("Log client disconnected", SOURCE_BACKEND);
}

/// Forward frames to the socket until either side goes away, then drop
/// the sink. A `None` from the subscription means this sink was pruned as
/// stalled; the socket is closed rather than left silently frozen.
async fn pump<T: Serialize + Clone>(
    socket: WebSocket,
    channel: &Channel<T>,
    mut subscription: Subscription<T>,
) {
    let (mut sender, mut receiver) = socket.split();

    loop {
        tokio::select! {
            frame = subscription.recv() => match frame {
                Some(frame) => {
                    let json = match serde_json::to_string(&frame) {
                        Ok(json) => json,
                        Err(err) => {
                            warn!("Failed to serialize observer frame: {err}");
                            continue;
                        }
                    };
                    if sender.send(Message::Text(json.into())).await.is_err() {
                        break;
                    }
                }
                None => break,
            },
            inbound = receiver.next() => match inbound {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }

    channel.unsubscribe(subscription.id());
}

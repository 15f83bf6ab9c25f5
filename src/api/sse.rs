//! Pull-style log tail over Server-Sent Events.
//!
//! Replays the scope's bounded log buffer, then streams new entries as
//! they arrive, with a 1-second keep-alive so idle tails stay open.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use futures::StreamExt;
use log::warn;
use tokio_stream::wrappers::ReceiverStream;

use crate::ws::types::SOURCE_BACKEND;

use super::state::AppState;

/// GET /api/v1/logs/{network}/stream
pub async fn log_stream(
    State(state): State<AppState>,
    Path(network): Path<String>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let hub = state.hubs.hub(&network);
    let subscription = hub.logs().subscribe();
    hub.log_event("New log stream client connected", SOURCE_BACKEND);

    let stream = ReceiverStream::new(subscription.into_receiver()).filter_map(|frame| async move {
        match Event::default().json_data(&frame) {
            Ok(event) => Some(Ok(event)),
            Err(err) => {
                warn!("Failed to serialize log frame for SSE: {err}");
                None
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(1)))
}

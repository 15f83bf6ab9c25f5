//! API route definitions.

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::ws;

use super::handlers;
use super::sse;
use super::state::AppState;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    // The console frontend may be served from anywhere during development.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::DEBUG))
        .on_request(DefaultOnRequest::new().level(Level::DEBUG))
        .on_response(DefaultOnResponse::new().level(Level::DEBUG));

    Router::new()
        // Health & version
        .route("/api/v1/ping", get(handlers::ping))
        .route("/api/v1/version", get(handlers::version))
        // Network metadata
        .route("/api/v1/networks", get(handlers::list_networks))
        .route(
            "/api/v1/connectivity/{network}",
            get(handlers::connectivity),
        )
        .route(
            "/api/v1/compact_connectivity/{network}",
            get(handlers::compact_connectivity),
        )
        // Runtime endpoint configuration
        .route(
            "/api/v1/config",
            get(handlers::get_config).post(handlers::set_config),
        )
        // Pull-style chat and log tail
        .route(
            "/api/v1/streaming_chat/{network}",
            post(handlers::streaming_chat),
        )
        .route("/api/v1/logs/{network}/stream", get(sse::log_stream))
        // Live channels
        .route("/api/v1/ws/chat/{network}", get(ws::chat::chat_ws_handler))
        .route(
            "/api/v1/ws/internalchat/{network}",
            get(ws::observe::internal_chat_ws_handler),
        )
        .route(
            "/api/v1/ws/logs/{network}",
            get(ws::observe::network_logs_ws_handler),
        )
        .route("/api/v1/ws/logs", get(ws::observe::global_logs_ws_handler))
        .layer(trace_layer)
        .layer(cors)
        .with_state(state)
}

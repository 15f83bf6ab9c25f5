//! HTTP API module.
//!
//! REST surface plus the WebSocket/SSE route wiring.

mod error;
mod handlers;
mod routes;
mod sse;
pub mod state;

pub use error::{ApiError, ApiResult, ErrorResponse};
pub use routes::create_router;
pub use state::AppState;

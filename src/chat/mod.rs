//! Chat turn pipeline.
//!
//! A turn is one user message and its complete upstream response stream.
//! [`turn::run_turn`] owns the stream, [`classify`] splits each raw
//! message into typed events, and [`session`] keeps the continuation
//! context that stitches turns into a conversation.

pub mod classify;
pub mod session;
pub mod turn;

pub use classify::{ClassifiedEvent, TurnClassifier};
pub use session::{SessionContext, SessionStore};
pub use turn::{TurnError, TurnOutcome, TurnRequest, run_turn};

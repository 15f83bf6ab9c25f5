//! Swarmdeck backend library.
//!
//! Browser-facing backend for observing and driving multi-agent
//! conversation networks hosted in an external mesh runtime. The core is
//! the per-scope fan-out hub in [`ws`]: one upstream streaming call per
//! chat turn is demultiplexed into typed feeds (final answer, agent trace,
//! raw logs) and multiplexed out to any number of connected subscribers.

pub mod api;
pub mod chat;
pub mod mesh;
pub mod ws;

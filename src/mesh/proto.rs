//! Generated mesh runtime protocol (see `proto/mesh.proto` and `build.rs`).

include!(concat!(env!("OUT_DIR"), "/mesh.v1.rs"));

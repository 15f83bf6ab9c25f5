//! Compiles the mesh runtime protocol definitions to gRPC stubs.
//!
//! Uses `tonic-prost-build` with the vendored `protoc` binary so builds do
//! not depend on a system protobuf installation. Generated code lands in
//! `OUT_DIR` and is pulled in via `tonic::include_proto!` in
//! `src/mesh/proto.rs`.

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Point prost at the vendored protoc binary and its well-known-type
    // includes (needed for google/protobuf/struct.proto).
    unsafe {
        std::env::set_var("PROTOC", protoc_bin_vendored::protoc_bin_path()?);
    }
    let wkt_include = protoc_bin_vendored::include_path()?;

    tonic_prost_build::configure()
        .build_server(true)
        .build_client(true)
        .compile_protos(
            &[std::path::PathBuf::from("proto/mesh.proto")],
            &[std::path::PathBuf::from("proto"), wkt_include],
        )?;

    println!("cargo:rerun-if-changed=proto/mesh.proto");

    Ok(())
}

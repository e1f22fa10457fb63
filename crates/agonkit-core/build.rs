//! Build script for agonkit-core.
//!
//! Compiles the sidecar protobuf definitions (core, alpha and beta surfaces).
//! `protoc` and the well-known type includes come from protobuf-src so no
//! system installation is required.

use std::path::PathBuf;

const PROTO_FILES: &[&str] = &["proto/sdk.proto", "proto/alpha.proto", "proto/beta.proto"];

fn main() {
    let out_dir = PathBuf::from(std::env::var("OUT_DIR").unwrap());

    for proto in PROTO_FILES {
        println!("cargo:rerun-if-changed={proto}");
    }

    let mut prost_config = prost_build::Config::new();
    prost_config.protoc_executable(protobuf_src::protoc());

    let includes = [PathBuf::from("proto"), protobuf_src::include()];

    tonic_build::configure()
        .build_server(true)
        .build_client(true)
        .emit_rerun_if_changed(true)
        .out_dir(&out_dir)
        .compile_protos_with_config(prost_config, PROTO_FILES, &includes)
        .unwrap_or_else(|e| panic!("Failed to compile proto files: {e}"));

    println!("cargo:info=Generated sidecar gRPC code to {}", out_dir.display());
}

//! Generated gRPC bindings for the coordinator callback service
//!
//! Regenerate with: cargo build --features proto-gen (requires protoc)

pub mod worker;

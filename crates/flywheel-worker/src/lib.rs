//! Flywheel Worker - Task processing engine
//!
//! This crate provides the worker process for Flywheel:
//! - Sequential task consumption from the broker
//! - Gemini inference client
//! - gRPC result delivery to the coordinator callback
//! - The Idle/Busy pipeline state machine

pub mod delivery;
pub mod generated;
pub mod inference;
pub mod pipeline;

pub use delivery::{Endpoint, GrpcDelivery, ResultSink};
pub use generated::worker as proto;
pub use inference::{GeminiClient, Inference};
pub use pipeline::TaskPipeline;

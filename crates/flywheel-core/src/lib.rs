//! Flywheel Core - Core types for the Flywheel worker node
//!
//! This crate provides the fundamental building blocks for Flywheel:
//! - Task and result data model
//! - Worker identity and status
//! - Status/log event payloads
//! - Configuration structures
//! - Error types

pub mod config;
pub mod error;
pub mod event;
pub mod identity;
pub mod task;

pub use config::{BrokerConfig, DeliveryConfig, FlywheelConfig, InferenceConfig, WorkerConfig};
pub use error::{Error, Result};
pub use event::{now_millis, LogEvent, Registration, StatusEvent};
pub use identity::{WorkerIdentity, WorkerStatus};
pub use task::{Task, TaskResult};

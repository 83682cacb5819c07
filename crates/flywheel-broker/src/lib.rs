//! Flywheel Broker - Pub/sub transport layer
//!
//! This crate connects the worker to the fleet's message broker:
//! - `Broker`/`Consumer` traits at the transport seam
//! - MQTT implementation (`rumqttc`) with a serialized inbound queue
//! - Topic naming under the fleet namespace
//! - Best-effort status/log event publishing
//! - An in-process broker for tests

pub mod events;
pub mod memory;
pub mod mqtt;
pub mod topics;
pub mod traits;

pub use events::EventPublisher;
pub use memory::{memory_consumer, MemoryBroker, MemoryConsumer};
pub use mqtt::{MqttBroker, MqttConsumer};
pub use topics::Topics;
pub use traits::{Broker, BrokerError, BrokerResult, Consumer, InboundMessage};

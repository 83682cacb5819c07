//! Best-effort status/log event publishing
//!
//! Events are JSON-encoded and published fire-and-forget: a failed publish
//! is logged locally and dropped. Nothing here may alter pipeline state or
//! abort task processing.

use crate::topics::Topics;
use crate::traits::Broker;
use flywheel_core::{LogEvent, Registration, StatusEvent, WorkerIdentity, WorkerStatus};
use serde::Serialize;
use tracing::{info, warn};

/// Publishes registration, status and log events on the fleet topics
#[derive(Clone)]
pub struct EventPublisher<B: Broker> {
    broker: B,
    topics: Topics,
    worker_id: String,
}

impl<B: Broker> EventPublisher<B> {
    /// Create a publisher for one worker
    pub fn new(broker: B, topics: Topics, worker_id: impl Into<String>) -> Self {
        Self {
            broker,
            topics,
            worker_id: worker_id.into(),
        }
    }

    async fn publish_json<T: Serialize>(&self, topic: &str, value: &T) {
        let payload = match serde_json::to_vec(value) {
            Ok(p) => p,
            Err(e) => {
                warn!("Failed to encode event for {}: {}", topic, e);
                return;
            }
        };
        if let Err(e) = self.broker.publish(topic, payload).await {
            warn!("Failed to publish event to {}: {}", topic, e);
        }
    }

    /// Announce this worker to the coordinator
    pub async fn register(&self, identity: &WorkerIdentity) {
        let registration = Registration::new(identity);
        self.publish_json(&self.topics.register(), &registration)
            .await;
        self.log(format!("Worker {} registered", self.worker_id))
            .await;
    }

    /// Publish a status transition
    pub async fn status(&self, status: WorkerStatus) {
        let event = StatusEvent::new(&self.worker_id, status);
        self.publish_json(&self.topics.status(), &event).await;
        self.log(format!(
            "Worker {} changed status to: {}",
            self.worker_id, status
        ))
        .await;
    }

    /// Mirror a log line onto the fleet log topic
    pub async fn log(&self, message: impl Into<String>) {
        let message = message.into();
        info!(worker_id = %self.worker_id, "{}", message);
        let event = LogEvent::new(&self.worker_id, message);
        self.publish_json(&self.topics.logs(), &event).await;
    }
}

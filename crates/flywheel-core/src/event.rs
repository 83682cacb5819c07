//! Side-channel event payloads
//!
//! All three events are fire-and-forget JSON records: never persisted,
//! never acknowledged, and never allowed to disturb the task pipeline.

use crate::identity::{WorkerIdentity, WorkerStatus};
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Current time as epoch milliseconds (the fleet-wide timestamp format)
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Announces this worker to the coordinator on startup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registration {
    pub worker_id: String,
    pub language: String,
    pub status: WorkerStatus,
    pub timestamp: i64,
}

impl Registration {
    /// Build the registration record for a freshly started worker
    pub fn new(identity: &WorkerIdentity) -> Self {
        Self {
            worker_id: identity.id.clone(),
            language: identity.language.clone(),
            status: WorkerStatus::Idle,
            timestamp: now_millis(),
        }
    }
}

/// Reports a status transition of one worker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusEvent {
    pub worker_id: String,
    pub status: WorkerStatus,
    pub timestamp: i64,
}

impl StatusEvent {
    pub fn new(worker_id: impl Into<String>, status: WorkerStatus) -> Self {
        Self {
            worker_id: worker_id.into(),
            status,
            timestamp: now_millis(),
        }
    }
}

/// A log line mirrored onto the broker for the fleet dashboard
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEvent {
    pub timestamp: i64,
    pub source: String,
    pub message: String,
}

impl LogEvent {
    pub fn new(source: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            timestamp: now_millis(),
            source: source.into(),
            message: message.into(),
        }
    }
}

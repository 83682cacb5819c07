//! Task and result data model

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// One unit of work, decoded from a single inbound broker message
///
/// Consumed exactly once; never persisted or retried by the worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Session the task belongs to
    pub session_id: String,

    /// Free-text query for the inference service
    pub query: String,

    /// Credential forwarded to the inference service
    pub api_key: String,

    /// `host:port` address of the coordinator's callback service
    pub grpc_endpoint: String,

    /// Epoch milliseconds when the coordinator created the task
    pub timestamp: i64,
}

impl Task {
    /// Decode a task from a raw broker payload
    pub fn from_payload(payload: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(payload)?)
    }
}

/// Computed answer plus timing metadata, delivered once to the coordinator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    /// Worker that processed the task
    pub worker_id: String,

    /// Session the task belongs to
    pub session_id: String,

    /// The query exactly as received
    pub original_query: String,

    /// Inference output, or an in-band diagnostic string
    pub ai_response: String,

    /// Credential echoed back from the task
    pub api_key: String,

    /// Wall-clock processing duration in milliseconds
    pub processing_time_ms: i64,

    /// The task's own timestamp, echoed back
    pub query_timestamp: i64,

    /// Epoch milliseconds when processing finished
    pub completion_timestamp: i64,
}

//! Worker identity and status

use crate::config::WorkerConfig;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Implementation language advertised to the coordinator
pub const WORKER_LANGUAGE: &str = "Rust";

/// Availability state of the worker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerStatus {
    /// Waiting for a task
    Idle,
    /// Processing a task
    Busy,
}

impl std::fmt::Display for WorkerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkerStatus::Idle => write!(f, "idle"),
            WorkerStatus::Busy => write!(f, "busy"),
        }
    }
}

/// Process-lifetime-stable worker identity
#[derive(Debug, Clone)]
pub struct WorkerIdentity {
    /// Unique worker ID, e.g. `rust-worker-host01-1a2b3c4d`
    pub id: String,
    /// Implementation language tag
    pub language: String,
}

impl WorkerIdentity {
    /// Create the identity for this process
    ///
    /// Uses the configured ID verbatim if one was given, otherwise derives
    /// `rust-worker-{hostname}-{8 hex chars}`. Called once at startup.
    pub fn generate(config: &WorkerConfig) -> Self {
        let id = config.id.clone().unwrap_or_else(|| {
            let suffix = Uuid::new_v4().simple().to_string();
            format!("rust-worker-{}-{}", config.get_hostname(), &suffix[..8])
        });

        Self {
            id,
            language: WORKER_LANGUAGE.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_id_format() {
        let config = WorkerConfig {
            hostname: Some("host01".to_string()),
            ..Default::default()
        };
        let identity = WorkerIdentity::generate(&config);
        assert!(identity.id.starts_with("rust-worker-host01-"));
        // 8 hex chars after the last dash
        let suffix = identity.id.rsplit('-').next().unwrap();
        assert_eq!(suffix.len(), 8);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(identity.language, "Rust");
    }

    #[test]
    fn test_explicit_id_wins() {
        let config = WorkerConfig {
            id: Some("worker-a".to_string()),
            ..Default::default()
        };
        let identity = WorkerIdentity::generate(&config);
        assert_eq!(identity.id, "worker-a");
    }

    #[test]
    fn test_ids_are_unique() {
        let config = WorkerConfig::default();
        let a = WorkerIdentity::generate(&config);
        let b = WorkerIdentity::generate(&config);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&WorkerStatus::Busy).unwrap(),
            "\"busy\""
        );
        assert_eq!(WorkerStatus::Idle.to_string(), "idle");
    }
}

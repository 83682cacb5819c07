//! Topic naming under the fleet namespace
//!
//! The whole fleet shares a namespace prefix (historically `upb`); setting
//! an empty namespace yields the bare topic names.

/// Derives the four fleet topics for one worker
#[derive(Debug, Clone)]
pub struct Topics {
    namespace: String,
}

impl Topics {
    /// Create a topic map under the given namespace
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    fn prefixed(&self, rest: &str) -> String {
        if self.namespace.is_empty() {
            rest.to_string()
        } else {
            format!("{}/{}", self.namespace, rest)
        }
    }

    /// Topic workers announce themselves on
    pub fn register(&self) -> String {
        self.prefixed("workers/register")
    }

    /// Topic for worker status transitions
    pub fn status(&self) -> String {
        self.prefixed("workers/status")
    }

    /// Topic for fleet-visible log events
    pub fn logs(&self) -> String {
        self.prefixed("logs")
    }

    /// Worker-exclusive task topic
    pub fn tasks(&self, worker_id: &str) -> String {
        self.prefixed(&format!("workers/{}/tasks", worker_id))
    }
}

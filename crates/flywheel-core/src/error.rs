//! Error types for Flywheel

use thiserror::Error;

/// Result type alias using Flywheel's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for Flywheel operations
///
/// Inference failures are deliberately absent: the inference client absorbs
/// them into the response text so the pipeline always has a string to carry
/// forward into a `TaskResult`.
#[derive(Error, Debug)]
pub enum Error {
    /// Fatal startup error (broker unreachable, bad listen address, ...)
    #[error("startup error: {0}")]
    Startup(String),

    /// Broker connection lost after startup
    #[error("transport error: {0}")]
    Transport(String),

    /// Inbound task payload could not be decoded
    #[error("task decode error: {0}")]
    TaskDecode(String),

    /// The per-task delivery endpoint was not a valid host:port pair
    #[error("bad delivery endpoint {endpoint:?}: {reason}")]
    BadEndpoint { endpoint: String, reason: String },

    /// The result callback RPC failed
    #[error("delivery error: {0}")]
    Delivery(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl Error {
    /// Check if this error must terminate the process
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Startup(_) | Error::Configuration(_))
    }

    /// Check if this error loses a task or its result
    ///
    /// These are the silent-drop cases: the message or result is gone for
    /// good and the coordinator is never told.
    pub fn loses_work(&self) -> bool {
        matches!(
            self,
            Error::TaskDecode(_) | Error::BadEndpoint { .. } | Error::Delivery(_)
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::TaskDecode(err.to_string())
    }
}

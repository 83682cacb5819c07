//! Broker trait definitions

use async_trait::async_trait;
use thiserror::Error;

/// Result type for broker operations
pub type BrokerResult<T> = Result<T, BrokerError>;

/// Errors that can occur during broker operations
#[derive(Error, Debug)]
pub enum BrokerError {
    /// Connection error
    #[error("connection error: {0}")]
    Connection(String),

    /// Publish error
    #[error("publish error: {0}")]
    Publish(String),

    /// Subscribe error
    #[error("subscribe error: {0}")]
    Subscribe(String),

    /// The connection is gone and will not come back
    #[error("connection closed")]
    Closed,
}

impl From<BrokerError> for flywheel_core::Error {
    fn from(err: BrokerError) -> Self {
        match err {
            BrokerError::Connection(msg) => flywheel_core::Error::Startup(msg),
            other => flywheel_core::Error::Transport(other.to_string()),
        }
    }
}

/// One raw message received from the broker
#[derive(Debug, Clone)]
pub struct InboundMessage {
    /// Topic the message arrived on
    pub topic: String,

    /// Raw payload bytes
    pub payload: Vec<u8>,
}

/// Publish capability of the broker connection
#[async_trait]
pub trait Broker: Send + Sync + Clone {
    /// Publish a payload to a topic
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> BrokerResult<()>;

    /// Check if the connection is still up
    fn is_connected(&self) -> bool;
}

/// Sequential consumer of inbound messages
///
/// `next` takes `&mut self`: the caller holds the only consuming handle, so
/// message *n+1* cannot be observed before the handler for message *n* is
/// back in this loop. Returns `None` once the underlying connection is lost;
/// the stream never resumes.
#[async_trait]
pub trait Consumer: Send {
    /// Get the next inbound message
    async fn next(&mut self) -> Option<InboundMessage>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_error_is_fatal_at_startup() {
        let err: flywheel_core::Error = BrokerError::Connection("refused".into()).into();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_closed_maps_to_transport() {
        let err: flywheel_core::Error = BrokerError::Closed.into();
        assert!(!err.is_fatal());
        assert!(matches!(err, flywheel_core::Error::Transport(_)));
    }
}

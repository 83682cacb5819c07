//! Result delivery to the coordinator callback
//!
//! The delivery address arrives inside each task, so a fresh plaintext
//! channel is opened per call and torn down immediately after the ack:
//! acquire, use, release. No pooling, no reuse, no retry.

use crate::proto;
use crate::proto::worker_callback_client::WorkerCallbackClient;
use async_trait::async_trait;
use flywheel_core::config::DeliveryConfig;
use flywheel_core::{Error, Result, TaskResult};
use std::str::FromStr;
use tracing::debug;

/// Validated `host:port` delivery address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl FromStr for Endpoint {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let bad = |reason: &str| Error::BadEndpoint {
            endpoint: s.to_string(),
            reason: reason.to_string(),
        };

        let (host, port) = s.rsplit_once(':').ok_or_else(|| bad("missing ':'"))?;
        if host.is_empty() {
            return Err(bad("empty host"));
        }
        let port: u16 = port.parse().map_err(|_| bad("port is not a number"))?;
        if port == 0 {
            return Err(bad("port is zero"));
        }

        Ok(Self {
            host: host.to_string(),
            port,
        })
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Seam for result delivery so the pipeline can be tested with a stub
#[async_trait]
pub trait ResultSink: Send + Sync {
    /// Deliver one result and return the coordinator's ack message
    async fn send(&self, endpoint: &Endpoint, result: &TaskResult) -> Result<String>;
}

/// gRPC delivery client
pub struct GrpcDelivery {
    config: DeliveryConfig,
}

impl GrpcDelivery {
    /// Create a delivery client
    pub fn new(config: DeliveryConfig) -> Self {
        Self { config }
    }
}

impl From<&TaskResult> for proto::TaskResult {
    fn from(result: &TaskResult) -> Self {
        Self {
            worker_id: result.worker_id.clone(),
            session_id: result.session_id.clone(),
            original_query: result.original_query.clone(),
            ai_response: result.ai_response.clone(),
            api_key: result.api_key.clone(),
            processing_time_ms: result.processing_time_ms,
            query_timestamp: result.query_timestamp,
            completion_timestamp: result.completion_timestamp,
        }
    }
}

#[async_trait]
impl ResultSink for GrpcDelivery {
    async fn send(&self, endpoint: &Endpoint, result: &TaskResult) -> Result<String> {
        let uri = format!("http://{}", endpoint);
        debug!("Opening delivery channel to {}", uri);

        let channel = tonic::transport::Endpoint::from_shared(uri)
            .map_err(|e| Error::Delivery(e.to_string()))?
            .connect_timeout(self.config.connect_timeout())
            .timeout(self.config.rpc_timeout())
            .connect()
            .await
            .map_err(|e| Error::Delivery(format!("connect to {} failed: {}", endpoint, e)))?;

        let mut client = WorkerCallbackClient::new(channel);
        let ack = client
            .send_result(proto::TaskResult::from(result))
            .await
            .map_err(|status| Error::Delivery(format!("SendResult failed: {}", status)))?
            .into_inner();

        debug!(
            "Delivery to {} acked (success={}): {}",
            endpoint, ack.success, ack.message
        );
        // Channel drops here; lifetime is exactly this one call
        Ok(ack.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_endpoint() {
        let endpoint: Endpoint = "localhost:9999".parse().unwrap();
        assert_eq!(endpoint.host, "localhost");
        assert_eq!(endpoint.port, 9999);
        assert_eq!(endpoint.to_string(), "localhost:9999");
    }

    #[test]
    fn test_parse_rejects_missing_port() {
        let err = "not-a-host-port".parse::<Endpoint>().unwrap_err();
        assert!(matches!(err, Error::BadEndpoint { .. }));
    }

    #[test]
    fn test_parse_rejects_bad_port() {
        assert!("host:abc".parse::<Endpoint>().is_err());
        assert!("host:70000".parse::<Endpoint>().is_err());
        assert!("host:0".parse::<Endpoint>().is_err());
    }

    #[test]
    fn test_parse_rejects_empty_host() {
        assert!(":9999".parse::<Endpoint>().is_err());
    }

    #[test]
    fn test_proto_conversion_copies_every_field() {
        let result = TaskResult {
            worker_id: "w".into(),
            session_id: "s".into(),
            original_query: "q".into(),
            ai_response: "a".into(),
            api_key: "k".into(),
            processing_time_ms: 10_500,
            query_timestamp: 1000,
            completion_timestamp: 11_500,
        };
        let wire = proto::TaskResult::from(&result);
        assert_eq!(wire.worker_id, "w");
        assert_eq!(wire.session_id, "s");
        assert_eq!(wire.original_query, "q");
        assert_eq!(wire.ai_response, "a");
        assert_eq!(wire.api_key, "k");
        assert_eq!(wire.processing_time_ms, 10_500);
        assert_eq!(wire.query_timestamp, 1000);
        assert_eq!(wire.completion_timestamp, 11_500);
    }
}

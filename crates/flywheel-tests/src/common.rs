//! Common test utilities and fixtures

use async_trait::async_trait;
use flywheel_worker::Inference;
use std::sync::Once;

static INIT: Once = Once::new();

/// Initialize test environment (logging, etc.)
pub fn init() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_env_filter("flywheel=debug")
            .try_init();
    });
}

/// Check if an MQTT broker is available for integration tests
pub async fn mqtt_available() -> bool {
    use std::time::Duration;

    matches!(
        tokio::time::timeout(
            Duration::from_secs(1),
            tokio::net::TcpStream::connect("localhost:1883")
        )
        .await,
        Ok(Ok(_))
    )
}

/// Generate a unique session ID
pub fn unique_session_id() -> String {
    format!("session_{}", uuid::Uuid::new_v4())
}

/// Generate a unique worker ID
pub fn unique_worker_id(prefix: &str) -> String {
    format!(
        "{}_{}",
        prefix,
        &uuid::Uuid::new_v4().simple().to_string()[..8]
    )
}

/// Inference stub returning a canned response
pub struct StubInference {
    pub response: String,
}

impl StubInference {
    pub fn returning(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
        }
    }
}

#[async_trait]
impl Inference for StubInference {
    async fn generate(&self, _query: &str, _api_key: &str) -> String {
        self.response.clone()
    }
}

//! Configuration structures for Flywheel

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Main configuration for the Flywheel worker
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlywheelConfig {
    /// Broker configuration
    #[serde(default)]
    pub broker: BrokerConfig,

    /// Worker configuration
    #[serde(default)]
    pub worker: WorkerConfig,

    /// Inference service configuration
    #[serde(default)]
    pub inference: InferenceConfig,

    /// Result delivery configuration
    #[serde(default)]
    pub delivery: DeliveryConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl FlywheelConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            crate::Error::Configuration(format!("Failed to read config file: {}", e))
        })?;

        toml::from_str(&content)
            .map_err(|e| crate::Error::Configuration(format!("Failed to parse config: {}", e)))
    }

    /// Load configuration from environment variables
    ///
    /// `MQTT_BROKER` and `MQTT_PORT` are the variable names the rest of the
    /// fleet uses; everything else is under the `FLYWHEEL_` prefix.
    pub fn from_env() -> crate::Result<Self> {
        let mut config = Self::default();

        if let Ok(host) = std::env::var("MQTT_BROKER") {
            config.broker.host = host;
        }
        if let Ok(port) = std::env::var("MQTT_PORT") {
            config.broker.port = port
                .parse()
                .map_err(|_| crate::Error::Configuration(format!("invalid MQTT_PORT: {}", port)))?;
        }
        if let Ok(ns) = std::env::var("FLYWHEEL_TOPIC_NAMESPACE") {
            config.broker.topic_namespace = ns;
        }
        if let Ok(delay) = std::env::var("FLYWHEEL_SIMULATED_DELAY_MS") {
            config.worker.simulated_delay_ms = delay.parse().map_err(|_| {
                crate::Error::Configuration(format!("invalid FLYWHEEL_SIMULATED_DELAY_MS: {}", delay))
            })?;
        }
        if let Ok(url) = std::env::var("FLYWHEEL_INFERENCE_URL") {
            config.inference.base_url = url;
        }

        Ok(config)
    }

    /// Merge configuration from file and environment
    ///
    /// Environment variables take precedence over the file.
    pub fn load(path: Option<impl AsRef<Path>>) -> crate::Result<Self> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };

        let env_config = Self::from_env()?;

        if std::env::var("MQTT_BROKER").is_ok() {
            config.broker.host = env_config.broker.host;
        }
        if std::env::var("MQTT_PORT").is_ok() {
            config.broker.port = env_config.broker.port;
        }
        if std::env::var("FLYWHEEL_TOPIC_NAMESPACE").is_ok() {
            config.broker.topic_namespace = env_config.broker.topic_namespace;
        }
        if std::env::var("FLYWHEEL_SIMULATED_DELAY_MS").is_ok() {
            config.worker.simulated_delay_ms = env_config.worker.simulated_delay_ms;
        }
        if std::env::var("FLYWHEEL_INFERENCE_URL").is_ok() {
            config.inference.base_url = env_config.inference.base_url;
        }

        Ok(config)
    }
}

/// Broker (MQTT) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerConfig {
    /// Broker hostname
    #[serde(default = "default_broker_host")]
    pub host: String,

    /// Broker port
    #[serde(default = "default_broker_port")]
    pub port: u16,

    /// MQTT keep-alive interval in seconds
    #[serde(default = "default_keep_alive")]
    pub keep_alive_secs: u64,

    /// Topic namespace prefixed to every topic (empty for none)
    #[serde(default = "default_topic_namespace")]
    pub topic_namespace: String,

    /// Inbound queue depth between the transport and the pipeline
    #[serde(default = "default_queue_depth")]
    pub queue_depth: usize,
}

fn default_broker_host() -> String {
    "mosquitto".to_string()
}

fn default_broker_port() -> u16 {
    1883
}

fn default_keep_alive() -> u64 {
    60
}

fn default_topic_namespace() -> String {
    "upb".to_string()
}

fn default_queue_depth() -> usize {
    16
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: default_broker_host(),
            port: default_broker_port(),
            keep_alive_secs: default_keep_alive(),
            topic_namespace: default_topic_namespace(),
            queue_depth: default_queue_depth(),
        }
    }
}

/// Worker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Worker ID (auto-generated if not specified)
    pub id: Option<String>,

    /// Hostname used in the generated worker ID
    pub hostname: Option<String>,

    /// Seconds to wait at startup for the broker to come up
    #[serde(default = "default_startup_grace")]
    pub startup_grace_secs: u64,

    /// Simulated workload duration in milliseconds
    ///
    /// Stand-in for real compute cost; parity with the rest of the fleet
    /// requires the 10 s default.
    #[serde(default = "default_simulated_delay")]
    pub simulated_delay_ms: u64,
}

fn default_startup_grace() -> u64 {
    5
}

fn default_simulated_delay() -> u64 {
    10_000
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            id: None,
            hostname: None,
            startup_grace_secs: default_startup_grace(),
            simulated_delay_ms: default_simulated_delay(),
        }
    }
}

impl WorkerConfig {
    /// Get the hostname, falling back to environment variables
    pub fn get_hostname(&self) -> String {
        self.hostname.clone().unwrap_or_else(|| {
            std::env::var("HOSTNAME")
                .or_else(|_| std::env::var("HOST"))
                .unwrap_or_else(|_| "unknown".to_string())
        })
    }

    /// Simulated workload duration
    pub fn simulated_delay(&self) -> Duration {
        Duration::from_millis(self.simulated_delay_ms)
    }
}

/// Inference service (Gemini) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceConfig {
    /// Base URL of the inference service
    #[serde(default = "default_inference_url")]
    pub base_url: String,

    /// Model name interpolated into the request path
    #[serde(default = "default_model")]
    pub model: String,

    /// Connect timeout in seconds
    #[serde(default = "default_inference_timeout")]
    pub connect_timeout_secs: u64,

    /// Read timeout in seconds
    #[serde(default = "default_inference_timeout")]
    pub read_timeout_secs: u64,
}

fn default_inference_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_model() -> String {
    "gemini-pro".to_string()
}

fn default_inference_timeout() -> u64 {
    30
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            base_url: default_inference_url(),
            model: default_model(),
            connect_timeout_secs: default_inference_timeout(),
            read_timeout_secs: default_inference_timeout(),
        }
    }
}

impl InferenceConfig {
    /// Connect timeout
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Read timeout
    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }
}

/// Result delivery (gRPC callback) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryConfig {
    /// Connect timeout in seconds
    #[serde(default = "default_delivery_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Overall deadline for the unary call in seconds
    #[serde(default = "default_rpc_timeout")]
    pub rpc_timeout_secs: u64,
}

fn default_delivery_connect_timeout() -> u64 {
    5
}

fn default_rpc_timeout() -> u64 {
    10
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_delivery_connect_timeout(),
            rpc_timeout_secs: default_rpc_timeout(),
        }
    }
}

impl DeliveryConfig {
    /// Connect timeout
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Overall deadline for the unary call
    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_secs(self.rpc_timeout_secs)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

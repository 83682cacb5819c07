//! Flywheel Worker - Main entry point

use anyhow::Result;
use clap::Parser;
use flywheel_broker::{EventPublisher, MqttBroker, Topics};
use flywheel_core::{FlywheelConfig, WorkerIdentity};
use flywheel_worker::{GeminiClient, GrpcDelivery, TaskPipeline};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// Flywheel Worker - One node of the distributed task fleet
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, env = "FLYWHEEL_CONFIG")]
    config: Option<String>,

    /// Broker hostname
    #[arg(long, env = "MQTT_BROKER")]
    broker_host: Option<String>,

    /// Broker port
    #[arg(long, env = "MQTT_PORT")]
    broker_port: Option<u16>,

    /// Worker ID (auto-generated if not provided)
    #[arg(long, env = "FLYWHEEL_WORKER_ID")]
    worker_id: Option<String>,

    /// Simulated workload duration in milliseconds
    #[arg(long, env = "FLYWHEEL_SIMULATED_DELAY_MS")]
    simulated_delay_ms: Option<u64>,

    /// Log level (falls back to the config file, then "info")
    #[arg(long, env = "FLYWHEEL_LOG_LEVEL")]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration; environment variables win over the file
    let mut config = FlywheelConfig::load(args.config.as_ref())?;

    // Initialize logging
    let level_name = args
        .log_level
        .clone()
        .unwrap_or_else(|| config.logging.level.clone());
    let log_level = match level_name.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(true)
        .init();

    if let Some(path) = &args.config {
        info!("Loaded configuration from {}", path);
    }

    // Override with CLI args
    if let Some(host) = args.broker_host {
        config.broker.host = host;
    }
    if let Some(port) = args.broker_port {
        config.broker.port = port;
    }
    if let Some(worker_id) = args.worker_id {
        config.worker.id = Some(worker_id);
    }
    if let Some(delay) = args.simulated_delay_ms {
        config.worker.simulated_delay_ms = delay;
    }

    let identity = WorkerIdentity::generate(&config.worker);

    info!("Starting Flywheel Worker v{}", env!("CARGO_PKG_VERSION"));
    info!("Worker ID: {}", identity.id);
    info!("Language: {}", identity.language);
    info!("Broker: {}:{}", config.broker.host, config.broker.port);

    // Give the broker a moment to come up when the fleet starts together
    if config.worker.startup_grace_secs > 0 {
        info!(
            "Waiting {} s for the broker to be ready...",
            config.worker.startup_grace_secs
        );
        tokio::time::sleep(Duration::from_secs(config.worker.startup_grace_secs)).await;
    }

    let topics = Topics::new(config.broker.topic_namespace.clone());
    let task_topic = topics.tasks(&identity.id);

    // A broker we cannot reach at startup is fatal: exit nonzero
    let (broker, consumer) = MqttBroker::connect(&config.broker, &identity.id, &task_topic)
        .await
        .map_err(|e| anyhow::anyhow!("fatal startup error: {}", e))?;

    let publisher = EventPublisher::new(broker, topics, identity.id.clone());
    publisher
        .log(format!("Worker {} connected to MQTT broker", identity.id))
        .await;
    publisher.register(&identity).await;

    let inference = Arc::new(GeminiClient::new(&config.inference)?);
    let delivery = Arc::new(GrpcDelivery::new(config.delivery.clone()));

    let mut pipeline = TaskPipeline::new(
        identity,
        &config.worker,
        publisher,
        inference,
        delivery,
    );

    info!("Flywheel Worker ready");

    // Runs until the broker connection is lost
    pipeline.run(consumer).await;

    // Known availability gap: no reconnection. The worker stays alive but
    // inert until externally restarted; it never exits on its own.
    warn!("Broker connection lost; worker is now inert");
    loop {
        tokio::time::sleep(Duration::from_secs(60)).await;
    }
}

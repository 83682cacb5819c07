//! MQTT broker implementation
//!
//! One clean (non-persistent) session per worker process. Inbound publishes
//! are forwarded from the event loop into a bounded queue consumed by the
//! task pipeline, so task handling is strictly sequential regardless of how
//! the transport schedules its callbacks.
//!
//! The driver must keep polling the event loop no matter what: outbound
//! publishes go through the same client and are only flushed by `poll()`,
//! so a driver stuck waiting on the inbound queue would also wedge every
//! status/log publish. Forwarding is therefore non-blocking; messages that
//! arrive while the queue is full are dropped, consistent with the
//! at-most-once delivery contract.
//!
//! Connection loss is terminal: the driver logs the error and stops polling,
//! the consumer stream ends, and the worker receives no further tasks until
//! it is externally restarted. This mirrors the rest of the fleet.

use crate::traits::{Broker, BrokerError, BrokerResult, Consumer, InboundMessage};
use async_trait::async_trait;
use flywheel_core::config::BrokerConfig;
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// How long to wait for the broker's CONNACK at startup
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// MQTT broker connection
#[derive(Clone)]
pub struct MqttBroker {
    client: AsyncClient,
    connected: Arc<AtomicBool>,
}

/// Sequential consumer over the worker's task topic
pub struct MqttConsumer {
    rx: mpsc::Receiver<InboundMessage>,
}

impl MqttBroker {
    /// Connect to the broker and subscribe to the worker's task topic
    ///
    /// Returns once the broker has acknowledged the connection; a broker
    /// that cannot be reached within the connect timeout is a startup
    /// failure, not something to retry.
    pub async fn connect(
        config: &BrokerConfig,
        client_id: &str,
        task_topic: &str,
    ) -> BrokerResult<(Self, MqttConsumer)> {
        let mut options = MqttOptions::new(client_id, &config.host, config.port);
        options.set_keep_alive(Duration::from_secs(config.keep_alive_secs));
        options.set_clean_session(true);

        let (client, mut eventloop) = AsyncClient::new(options, 10);

        // Wait for the CONNACK before declaring the connection up
        let connack = tokio::time::timeout(CONNECT_TIMEOUT, async {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Incoming(Packet::ConnAck(ack))) => return Ok(ack),
                    Ok(_) => continue,
                    Err(e) => return Err(BrokerError::Connection(e.to_string())),
                }
            }
        })
        .await
        .map_err(|_| BrokerError::Connection("timed out waiting for CONNACK".to_string()))??;

        debug!(?connack, "MQTT session established");
        info!("Connected to MQTT broker at {}:{}", config.host, config.port);

        client
            .subscribe(task_topic, QoS::AtMostOnce)
            .await
            .map_err(|e| BrokerError::Subscribe(e.to_string()))?;
        info!("Subscribed to {}", task_topic);

        let connected = Arc::new(AtomicBool::new(true));
        let (tx, rx) = mpsc::channel(config.queue_depth);

        // Single event-loop driver: forwards inbound publishes into the
        // queue without ever awaiting on it, and dies on the first
        // connection error.
        let connected_flag = Arc::clone(&connected);
        tokio::spawn(async move {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Incoming(Packet::Publish(publish))) => {
                        let message = InboundMessage {
                            topic: publish.topic.clone(),
                            payload: publish.payload.to_vec(),
                        };
                        if !forward_inbound(&tx, message) {
                            break;
                        }
                    }
                    Ok(_) => {}
                    Err(e) => {
                        error!("MQTT connection lost: {}", e);
                        break;
                    }
                }
            }
            connected_flag.store(false, Ordering::SeqCst);
            // Dropping tx ends the consumer stream
        });

        Ok((Self { client, connected }, MqttConsumer { rx }))
    }
}

/// Hand one inbound message to the pipeline queue without blocking
///
/// A full queue drops the message (at-most-once delivery); the driver must
/// get back to `poll()` immediately so outbound publishes keep flowing.
/// Returns false once the consumer is gone and the driver should stop.
fn forward_inbound(tx: &mpsc::Sender<InboundMessage>, message: InboundMessage) -> bool {
    match tx.try_send(message) {
        Ok(()) => true,
        Err(mpsc::error::TrySendError::Full(dropped)) => {
            warn!(
                "Inbound queue full; dropping message from {}",
                dropped.topic
            );
            true
        }
        Err(mpsc::error::TrySendError::Closed(_)) => {
            debug!("Consumer dropped; stopping MQTT driver");
            false
        }
    }
}

#[async_trait]
impl Broker for MqttBroker {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> BrokerResult<()> {
        if !self.is_connected() {
            return Err(BrokerError::Closed);
        }
        self.client
            .publish(topic, QoS::AtMostOnce, false, payload)
            .await
            .map_err(|e| {
                warn!("Publish to {} failed: {}", topic, e);
                BrokerError::Publish(e.to_string())
            })
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Consumer for MqttConsumer {
    async fn next(&mut self) -> Option<InboundMessage> {
        self.rx.recv().await
    }
}

//! In-process broker for tests
//!
//! Records everything published and feeds injected messages to a consumer,
//! so pipeline behavior can be exercised without a running MQTT broker.

use crate::traits::{Broker, BrokerError, BrokerResult, Consumer, InboundMessage};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// In-memory broker that records published payloads
#[derive(Clone, Default)]
pub struct MemoryBroker {
    published: Arc<Mutex<Vec<(String, Vec<u8>)>>>,
    fail_publishes: Arc<AtomicBool>,
}

impl MemoryBroker {
    /// Create an empty broker
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything published so far, in order
    pub fn published(&self) -> Vec<(String, Vec<u8>)> {
        self.published.lock().expect("lock poisoned").clone()
    }

    /// Payloads published to one topic, in order
    pub fn published_on(&self, topic: &str) -> Vec<Vec<u8>> {
        self.published()
            .into_iter()
            .filter(|(t, _)| t == topic)
            .map(|(_, p)| p)
            .collect()
    }

    /// Make every subsequent publish fail
    pub fn fail_publishes(&self, fail: bool) {
        self.fail_publishes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl Broker for MemoryBroker {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> BrokerResult<()> {
        if self.fail_publishes.load(Ordering::SeqCst) {
            return Err(BrokerError::Publish("injected failure".to_string()));
        }
        self.published
            .lock()
            .expect("lock poisoned")
            .push((topic.to_string(), payload));
        Ok(())
    }

    fn is_connected(&self) -> bool {
        true
    }
}

/// Consumer fed by an in-process channel
pub struct MemoryConsumer {
    rx: mpsc::Receiver<InboundMessage>,
}

#[async_trait]
impl Consumer for MemoryConsumer {
    async fn next(&mut self) -> Option<InboundMessage> {
        self.rx.recv().await
    }
}

/// Create an injection handle and the consumer it feeds
///
/// Dropping the sender ends the stream, which is exactly how a lost broker
/// connection looks to the pipeline.
pub fn memory_consumer(depth: usize) -> (mpsc::Sender<InboundMessage>, MemoryConsumer) {
    let (tx, rx) = mpsc::channel(depth);
    (tx, MemoryConsumer { rx })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_in_order() {
        let broker = MemoryBroker::new();
        broker.publish("a", b"1".to_vec()).await.unwrap();
        broker.publish("b", b"2".to_vec()).await.unwrap();
        broker.publish("a", b"3".to_vec()).await.unwrap();

        assert_eq!(broker.published().len(), 3);
        assert_eq!(broker.published_on("a"), vec![b"1".to_vec(), b"3".to_vec()]);
    }

    #[tokio::test]
    async fn test_consumer_ends_when_sender_drops() {
        let (tx, mut consumer) = memory_consumer(4);
        tx.send(InboundMessage {
            topic: "t".to_string(),
            payload: b"x".to_vec(),
        })
        .await
        .unwrap();
        drop(tx);

        assert_eq!(consumer.next().await.unwrap().payload, b"x".to_vec());
        assert!(consumer.next().await.is_none());
    }
}

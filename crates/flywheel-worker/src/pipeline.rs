//! The task pipeline state machine
//!
//! Two states, `Idle` and `Busy`, for the lifetime of the process. One task
//! at a time: the consume loop below is the single logical execution path,
//! so no locking guards the status field. Every failure inside processing
//! is caught, logged, and followed by the unconditional return to `Idle` -
//! nothing escapes to the transport layer.

use crate::delivery::{Endpoint, ResultSink};
use crate::inference::Inference;
use flywheel_broker::{Broker, Consumer, EventPublisher};
use flywheel_core::config::WorkerConfig;
use flywheel_core::{now_millis, Result, Task, TaskResult, WorkerIdentity, WorkerStatus};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// Worker context driving one task at a time through
/// inference, simulated workload, and result delivery
pub struct TaskPipeline<B: Broker> {
    identity: WorkerIdentity,
    status: WorkerStatus,
    simulated_delay: Duration,
    publisher: EventPublisher<B>,
    inference: Arc<dyn Inference>,
    delivery: Arc<dyn ResultSink>,
}

impl<B: Broker> TaskPipeline<B> {
    /// Create an idle pipeline
    pub fn new(
        identity: WorkerIdentity,
        config: &WorkerConfig,
        publisher: EventPublisher<B>,
        inference: Arc<dyn Inference>,
        delivery: Arc<dyn ResultSink>,
    ) -> Self {
        Self {
            identity,
            status: WorkerStatus::Idle,
            simulated_delay: config.simulated_delay(),
            publisher,
            inference,
            delivery,
        }
    }

    /// Current status
    pub fn status(&self) -> WorkerStatus {
        self.status
    }

    /// Consume tasks until the transport stream ends
    ///
    /// Delivery is strictly sequential: the next message is not taken from
    /// the consumer until the previous task has fully finished, so a second
    /// task's Busy event can never precede the first task's Idle event.
    pub async fn run<C: Consumer>(&mut self, mut consumer: C) {
        while let Some(message) = consumer.next().await {
            match Task::from_payload(&message.payload) {
                Ok(task) => {
                    info!("Task received: {:.50}...", task.query);
                    self.process(task).await;
                }
                Err(e) => {
                    error!("Dropping undecodable task message: {}", e);
                    self.publisher
                        .log(format!("Error decoding task message: {}", e))
                        .await;
                }
            }
        }
        warn!(
            "Task stream ended for worker {}; no further tasks will arrive",
            self.identity.id
        );
    }

    /// Process one task: Idle -> Busy -> (work) -> Idle
    ///
    /// The Idle transition fires on every exit path, whatever happened in
    /// between.
    pub async fn process(&mut self, task: Task) {
        self.publisher
            .log(format!(
                "Worker {} processing task for session {}",
                self.identity.id, task.session_id
            ))
            .await;
        self.set_status(WorkerStatus::Busy).await;

        match self.execute(&task).await {
            Ok(ack) => {
                self.publisher
                    .log(format!(
                        "Worker {} completed task successfully: {}",
                        self.identity.id, ack
                    ))
                    .await;
            }
            Err(e) => {
                if e.loses_work() {
                    error!(
                        "Task for session {} failed, result lost: {}",
                        task.session_id, e
                    );
                } else {
                    error!("Task for session {} failed: {}", task.session_id, e);
                }
                self.publisher
                    .log(format!(
                        "Worker {} error processing task: {}",
                        self.identity.id, e
                    ))
                    .await;
            }
        }

        self.set_status(WorkerStatus::Idle).await;
    }

    /// Steps 1-7 of task processing; failures come back as errors for the
    /// outcome log, never as panics
    async fn execute(&self, task: &Task) -> Result<String> {
        let start = Instant::now();

        self.publisher
            .log(format!(
                "Worker {} querying the inference service",
                self.identity.id
            ))
            .await;
        let ai_response = self.inference.generate(&task.query, &task.api_key).await;

        self.publisher
            .log(format!(
                "Worker {} simulating {} ms of processing",
                self.identity.id,
                self.simulated_delay.as_millis()
            ))
            .await;
        tokio::time::sleep(self.simulated_delay).await;

        let processing_time_ms = start.elapsed().as_millis() as i64;

        let result = TaskResult {
            worker_id: self.identity.id.clone(),
            session_id: task.session_id.clone(),
            original_query: task.query.clone(),
            ai_response,
            api_key: task.api_key.clone(),
            processing_time_ms,
            query_timestamp: task.timestamp,
            completion_timestamp: now_millis(),
        };

        // A malformed endpoint loses the result for good; the coordinator
        // is never signalled
        let endpoint: Endpoint = task.grpc_endpoint.parse()?;

        let ack = self.delivery.send(&endpoint, &result).await?;
        self.publisher
            .log(format!(
                "Worker {} sent result via gRPC: {}",
                self.identity.id, ack
            ))
            .await;

        Ok(ack)
    }

    async fn set_status(&mut self, status: WorkerStatus) {
        self.status = status;
        self.publisher.status(status).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use flywheel_broker::{memory_consumer, InboundMessage, MemoryBroker, Topics};
    use flywheel_core::Error;
    use std::sync::Mutex;

    struct StubInference {
        response: String,
    }

    #[async_trait]
    impl Inference for StubInference {
        async fn generate(&self, _query: &str, _api_key: &str) -> String {
            self.response.clone()
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        calls: Mutex<Vec<(Endpoint, TaskResult)>>,
        fail: bool,
    }

    #[async_trait]
    impl ResultSink for RecordingSink {
        async fn send(&self, endpoint: &Endpoint, result: &TaskResult) -> Result<String> {
            if self.fail {
                return Err(Error::Delivery("connection refused".to_string()));
            }
            self.calls
                .lock()
                .unwrap()
                .push((endpoint.clone(), result.clone()));
            Ok("received".to_string())
        }
    }

    fn task(endpoint: &str) -> Task {
        Task {
            session_id: "s1".to_string(),
            query: "hello".to_string(),
            api_key: "k".to_string(),
            grpc_endpoint: endpoint.to_string(),
            timestamp: 1000,
        }
    }

    fn pipeline(
        broker: MemoryBroker,
        sink: Arc<RecordingSink>,
    ) -> TaskPipeline<MemoryBroker> {
        let worker_config = WorkerConfig {
            id: Some("w1".to_string()),
            simulated_delay_ms: 20,
            ..Default::default()
        };
        let identity = WorkerIdentity::generate(&worker_config);
        let publisher = EventPublisher::new(broker, Topics::new("upb"), "w1");
        TaskPipeline::new(
            identity,
            &worker_config,
            publisher,
            Arc::new(StubInference {
                response: "hi".to_string(),
            }),
            sink,
        )
    }

    fn statuses(broker: &MemoryBroker) -> Vec<String> {
        broker
            .published_on("upb/workers/status")
            .iter()
            .map(|p| {
                let json: serde_json::Value = serde_json::from_slice(p).unwrap();
                json["status"].as_str().unwrap().to_string()
            })
            .collect()
    }

    #[tokio::test]
    async fn test_status_cycles_busy_then_idle() {
        let broker = MemoryBroker::new();
        let sink = Arc::new(RecordingSink::default());
        let mut pipeline = pipeline(broker.clone(), Arc::clone(&sink));

        pipeline.process(task("localhost:9999")).await;

        assert_eq!(pipeline.status(), WorkerStatus::Idle);
        assert_eq!(statuses(&broker), vec!["busy", "idle"]);
        assert_eq!(sink.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_result_echoes_task_fields() {
        let broker = MemoryBroker::new();
        let sink = Arc::new(RecordingSink::default());
        let mut pipeline = pipeline(broker, Arc::clone(&sink));

        pipeline.process(task("localhost:9999")).await;

        let calls = sink.calls.lock().unwrap();
        let (endpoint, result) = &calls[0];
        assert_eq!(endpoint.to_string(), "localhost:9999");
        assert_eq!(result.session_id, "s1");
        assert_eq!(result.original_query, "hello");
        assert_eq!(result.ai_response, "hi");
        assert_eq!(result.api_key, "k");
        assert_eq!(result.query_timestamp, 1000);
        assert!(result.processing_time_ms >= 20);
        assert!(result.completion_timestamp > 0);
    }

    #[tokio::test]
    async fn test_malformed_endpoint_skips_delivery_and_returns_idle() {
        let broker = MemoryBroker::new();
        let sink = Arc::new(RecordingSink::default());
        let mut pipeline = pipeline(broker.clone(), Arc::clone(&sink));

        pipeline.process(task("not-a-host-port")).await;

        assert!(sink.calls.lock().unwrap().is_empty());
        assert_eq!(pipeline.status(), WorkerStatus::Idle);
        assert_eq!(statuses(&broker), vec!["busy", "idle"]);
    }

    #[tokio::test]
    async fn test_delivery_failure_still_returns_idle() {
        let broker = MemoryBroker::new();
        let sink = Arc::new(RecordingSink {
            fail: true,
            ..Default::default()
        });
        let mut pipeline = pipeline(broker.clone(), Arc::clone(&sink));

        pipeline.process(task("localhost:9999")).await;

        assert_eq!(pipeline.status(), WorkerStatus::Idle);
        assert_eq!(statuses(&broker), vec!["busy", "idle"]);
        // Outcome log still fires
        let logs = broker.published_on("upb/logs");
        let outcome = logs
            .iter()
            .map(|p| serde_json::from_slice::<serde_json::Value>(p).unwrap())
            .any(|j| j["message"].as_str().unwrap().contains("error processing task"));
        assert!(outcome);
    }

    #[tokio::test]
    async fn test_undecodable_message_is_dropped() {
        let broker = MemoryBroker::new();
        let sink = Arc::new(RecordingSink::default());
        let mut pipeline = pipeline(broker.clone(), Arc::clone(&sink));

        let (tx, consumer) = memory_consumer(4);
        tx.send(InboundMessage {
            topic: "upb/workers/w1/tasks".to_string(),
            payload: b"{broken".to_vec(),
        })
        .await
        .unwrap();
        drop(tx);

        pipeline.run(consumer).await;

        assert!(sink.calls.lock().unwrap().is_empty());
        // No status transition for a dropped message
        assert!(statuses(&broker).is_empty());
        assert_eq!(pipeline.status(), WorkerStatus::Idle);
    }

    #[tokio::test]
    async fn test_back_to_back_tasks_never_interleave() {
        let broker = MemoryBroker::new();
        let sink = Arc::new(RecordingSink::default());
        let mut pipeline = pipeline(broker.clone(), Arc::clone(&sink));

        let payload = serde_json::to_vec(&task("localhost:9999")).unwrap();
        let (tx, consumer) = memory_consumer(4);
        tx.send(InboundMessage {
            topic: "t".to_string(),
            payload: payload.clone(),
        })
        .await
        .unwrap();
        tx.send(InboundMessage {
            topic: "t".to_string(),
            payload,
        })
        .await
        .unwrap();
        drop(tx);

        pipeline.run(consumer).await;

        // Replay produces two independent results, no deduplication
        assert_eq!(sink.calls.lock().unwrap().len(), 2);
        assert_eq!(statuses(&broker), vec!["busy", "idle", "busy", "idle"]);

        // Task 2's busy timestamp is not earlier than task 1's idle timestamp
        let events: Vec<serde_json::Value> = broker
            .published_on("upb/workers/status")
            .iter()
            .map(|p| serde_json::from_slice(p).unwrap())
            .collect();
        let first_idle = events[1]["timestamp"].as_i64().unwrap();
        let second_busy = events[2]["timestamp"].as_i64().unwrap();
        assert!(second_busy >= first_idle);
    }
}

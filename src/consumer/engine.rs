use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::forwarder::MessageForwarder;
use crate::gate::{AppStatus, RuntimeGate};
use crate::queue::{Message, QueueError, QueueTransport};
use crate::telemetry::Metrics;

use super::error::ConsumerError;
use super::sampler::TelemetrySampler;
use super::strategy::{MessageHandler, ProcessingStrategy};

const DEFAULT_STRATEGY: &str = "async";
const DEFAULT_PAUSED_BACKOFF: Duration = Duration::from_secs(1);
const DEFAULT_ERROR_BACKOFF: Duration = Duration::from_secs(5);
const DEFAULT_SAMPLE_INTERVAL: Duration = Duration::from_secs(1);

/// One worker per available core, keeping one core for the runtime
pub fn default_worker_count() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get().saturating_sub(1))
        .unwrap_or(1)
        .max(1)
}

/// Consumer tuning
#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    /// Number of polling workers
    pub workers: usize,
    /// Processing strategy tag, `sync` or `async`
    pub strategy_tag: String,
    /// Sleep between gate checks while stopped
    pub paused_backoff: Duration,
    /// Sleep after a receive failure or an unusable strategy
    pub error_backoff: Duration,
    /// Period of the telemetry sampler
    pub sample_interval: Duration,
}

impl ConsumerConfig {
    pub fn new() -> Self {
        Self {
            workers: default_worker_count(),
            strategy_tag: DEFAULT_STRATEGY.to_string(),
            paused_backoff: DEFAULT_PAUSED_BACKOFF,
            error_backoff: DEFAULT_ERROR_BACKOFF,
            sample_interval: DEFAULT_SAMPLE_INTERVAL,
        }
    }

    /// Set the worker count (builder pattern)
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Set the processing strategy tag (builder pattern)
    pub fn with_strategy(mut self, tag: impl Into<String>) -> Self {
        self.strategy_tag = tag.into();
        self
    }

    /// Set the sleep used while the gate is stopped (builder pattern)
    pub fn with_paused_backoff(mut self, backoff: Duration) -> Self {
        self.paused_backoff = backoff;
        self
    }

    /// Set the sleep used after a failed cycle (builder pattern)
    pub fn with_error_backoff(mut self, backoff: Duration) -> Self {
        self.error_backoff = backoff;
        self
    }

    /// Set the telemetry sampling period (builder pattern)
    pub fn with_sample_interval(mut self, interval: Duration) -> Self {
        self.sample_interval = interval;
        self
    }
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Polls the queue with a pool of workers and forwards every message
///
/// Cheap to clone; clones share the same transports.
#[derive(Clone)]
pub struct Consumer {
    config: ConsumerConfig,
    queue: Arc<dyn QueueTransport>,
    forwarder: Arc<dyn MessageForwarder>,
    gate: Arc<RuntimeGate>,
    metrics: Arc<Metrics>,
}

impl Consumer {
    /// Create a consumer
    ///
    /// # Errors
    ///
    /// Returns [`ConsumerError::InvalidWorkerCount`] when no worker is
    /// configured. The strategy tag is only checked when a batch arrives.
    pub fn new(
        config: ConsumerConfig,
        queue: Arc<dyn QueueTransport>,
        forwarder: Arc<dyn MessageForwarder>,
        gate: Arc<RuntimeGate>,
        metrics: Arc<Metrics>,
    ) -> Result<Self, ConsumerError> {
        if config.workers == 0 {
            return Err(ConsumerError::InvalidWorkerCount(config.workers));
        }

        Ok(Self {
            config,
            queue,
            forwarder,
            gate,
            metrics,
        })
    }

    pub fn config(&self) -> &ConsumerConfig {
        &self.config
    }

    /// Run every worker and the sampler until `token` is cancelled
    ///
    /// Resolves once all of them have returned.
    pub async fn start(&self, token: CancellationToken) {
        info!(
            workers = self.config.workers,
            strategy = %self.config.strategy_tag,
            "starting consumer"
        );

        let mut tasks = JoinSet::new();
        for worker_id in 0..self.config.workers {
            let consumer = self.clone();
            let token = token.clone();
            tasks.spawn(async move { consumer.run_worker(worker_id, token).await });
        }

        let sampler = TelemetrySampler::new(
            self.queue.clone(),
            self.metrics.clone(),
            self.config.workers,
            self.config.sample_interval,
        );
        let sampler_token = token.clone();
        tasks.spawn(async move { sampler.run(sampler_token).await });

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "consumer task failed");
            }
        }

        info!("consumer stopped");
    }

    /// Forward one message and delete it once the sink accepted it
    ///
    /// The forwarder logs and counts its own failures. A failed delete is
    /// logged and not retried; the message will be redelivered.
    pub async fn send_and_ack(&self, token: &CancellationToken, message: &Message) {
        if self.forwarder.forward(token, message).await.is_err() {
            return;
        }

        // The sink already has the message, so shutdown must not abort the ack.
        let ack_token = CancellationToken::new();
        if let Err(e) = self
            .queue
            .delete(&ack_token, &message.receipt_handle)
            .await
        {
            error!(
                message_id = ?message.message_id,
                receipt_handle = %message.receipt_handle,
                error = %e,
                "failed to delete message, it will be redelivered"
            );
        }
    }

    fn handler(&self) -> MessageHandler {
        let consumer = self.clone();
        Arc::new(move |token: CancellationToken, message: Message| {
            let consumer = consumer.clone();
            async move { consumer.send_and_ack(&token, &message).await }.boxed()
        })
    }

    async fn run_worker(&self, worker_id: usize, token: CancellationToken) {
        debug!(worker_id, "worker started");
        let handler = self.handler();

        while !token.is_cancelled() {
            if self.gate.app_status().await == AppStatus::Stopped {
                debug!(worker_id, "consumer stopped, skipping receive");
                self.pause(&token, self.config.paused_backoff).await;
                continue;
            }

            let batch = match self.queue.receive(&token).await {
                Ok(batch) => batch,
                Err(QueueError::Cancelled) => break,
                Err(e) => {
                    error!(worker_id, error = %e, "failed to receive messages");
                    self.pause(&token, self.config.error_backoff).await;
                    continue;
                }
            };

            if batch.is_empty() {
                continue;
            }

            let strategy = match ProcessingStrategy::resolve(&self.config.strategy_tag) {
                Ok(strategy) => strategy,
                Err(e) => {
                    error!(
                        worker_id,
                        error = %e,
                        messages = batch.len(),
                        "critical: cannot process batch, messages left for redelivery"
                    );
                    self.pause(&token, self.config.error_backoff).await;
                    continue;
                }
            };

            debug!(
                worker_id,
                messages = batch.len(),
                strategy = %strategy,
                "processing batch"
            );
            strategy.process(&token, batch, handler.clone()).await;
        }

        debug!(worker_id, "worker stopped");
    }

    /// Sleep for `backoff` unless cancelled first
    async fn pause(&self, token: &CancellationToken, backoff: Duration) {
        tokio::select! {
            _ = token.cancelled() => {}
            _ = tokio::time::sleep(backoff) => {}
        }
    }
}

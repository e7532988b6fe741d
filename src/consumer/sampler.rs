use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::queue::QueueTransport;
use crate::telemetry::{names, Metrics};

/// Periodically publishes the worker count and queue depth gauges
pub struct TelemetrySampler {
    queue: Arc<dyn QueueTransport>,
    metrics: Arc<Metrics>,
    workers: usize,
    interval: Duration,
}

impl TelemetrySampler {
    pub fn new(
        queue: Arc<dyn QueueTransport>,
        metrics: Arc<Metrics>,
        workers: usize,
        interval: Duration,
    ) -> Self {
        Self {
            queue,
            metrics,
            workers,
            interval,
        }
    }

    /// Sample until `token` is cancelled
    pub async fn run(&self, token: CancellationToken) {
        loop {
            self.sample(&token).await;

            tokio::select! {
                _ = token.cancelled() => return,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }
    }

    /// Record one sample; a failed count is logged and skipped
    pub async fn sample(&self, token: &CancellationToken) {
        self.metrics
            .set_gauge(names::CONSUMER_WORKERS, self.workers as u64);

        match self.queue.count(token).await {
            Ok(depth) => self.metrics.set_gauge(names::QUEUE_DEPTH, depth as u64),
            Err(e) => warn!(error = %e, "failed to read queue depth"),
        }
    }
}

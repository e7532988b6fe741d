use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_sqs::error::DisplayErrorContext;
use aws_sdk_sqs::types::QueueAttributeName;
use aws_sdk_sqs::Client;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::{BatchSize, Message, QueueError, QueueTransport, Result, MAX_BATCH_SIZE};

/// SQS caps a long poll at 20 seconds
const MAX_WAIT_TIME_SECONDS: u64 = 20;

/// Smallest accepted receive timeout; the long-poll wait is whole seconds
pub const MIN_QUEUE_TIMEOUT: Duration = Duration::from_secs(1);

/// Added to the long-poll wait to bound the receive call
const RECEIVE_MARGIN: Duration = Duration::from_secs(5);

/// Floor for delete and attribute calls
const MIN_CALL_DEADLINE: Duration = Duration::from_secs(5);

/// Configuration for an SQS-backed queue
#[derive(Debug, Clone)]
pub struct SqsQueueConfig {
    /// Logical queue name, used in logs
    pub name: String,

    /// Queue URL
    pub url: String,

    /// Maximum messages picked up by one receive (1..=10)
    pub parallel: usize,

    /// Receive timeout, at least 1s. Whole seconds become the long-poll wait
    /// time and the receive call is allowed that wait plus a 5s margin.
    pub timeout: Duration,
}

impl SqsQueueConfig {
    /// Create a configuration for the queue at `url`
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            name: String::new(),
            url: url.into(),
            parallel: MAX_BATCH_SIZE,
            timeout: Duration::from_millis(1000),
        }
    }

    /// Set the logical queue name (builder pattern)
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the batch size (builder pattern)
    pub fn with_parallel(mut self, parallel: usize) -> Self {
        self.parallel = parallel;
        self
    }

    /// Set the receive timeout (builder pattern)
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Queue transport backed by AWS SQS
#[derive(Debug, Clone)]
pub struct SqsQueue {
    client: Client,
    name: String,
    queue_url: String,
    batch_size: BatchSize,
    timeout: Duration,
}

impl SqsQueue {
    /// Create a transport from an existing SDK client
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::InvalidBatchSize`] when `config.parallel` is
    /// outside 1..=10, and [`QueueError::InvalidTimeout`] when
    /// `config.timeout` is under one second.
    pub fn new(config: SqsQueueConfig, client: Client) -> Result<Self> {
        let batch_size = BatchSize::new(config.parallel)?;
        validate_timeout(config.timeout)?;

        Ok(Self {
            client,
            name: config.name,
            queue_url: config.url,
            batch_size,
            timeout: config.timeout,
        })
    }

    /// Create a transport using the default AWS provider chain
    ///
    /// Region, credentials and endpoint come from the environment
    /// (`AWS_REGION`, `AWS_ENDPOINT_URL`, profiles, instance metadata, ...).
    pub async fn from_env(config: SqsQueueConfig) -> Result<Self> {
        // Validate before touching the provider chain
        BatchSize::new(config.parallel)?;
        validate_timeout(config.timeout)?;

        let sdk_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        let queue = Self::new(config, Client::new(&sdk_config))?;

        info!(
            queue = %queue.name,
            queue_url = %queue.queue_url,
            parallel = queue.batch_size.get(),
            timeout = ?queue.timeout,
            "SQS queue client created"
        );
        Ok(queue)
    }

    /// Long-poll wait time sent to SQS
    fn wait_time_seconds(&self) -> i32 {
        self.timeout.as_secs().min(MAX_WAIT_TIME_SECONDS) as i32
    }

    /// Deadline for the receive call; always longer than the long-poll wait
    fn receive_deadline(&self) -> Duration {
        Duration::from_secs(self.wait_time_seconds() as u64) + RECEIVE_MARGIN
    }

    /// Deadline for delete and attribute calls
    fn call_deadline(&self) -> Duration {
        self.timeout.max(MIN_CALL_DEADLINE)
    }

    /// Run an SDK call bounded by `deadline` and by cancellation
    async fn bounded<T, E, F>(
        &self,
        token: &CancellationToken,
        deadline: Duration,
        call: F,
    ) -> Option<std::result::Result<T, E>>
    where
        F: Future<Output = std::result::Result<T, E>>,
    {
        tokio::select! {
            _ = token.cancelled() => None,
            result = tokio::time::timeout(deadline, call) => result.ok(),
        }
    }
}

fn validate_timeout(timeout: Duration) -> Result<()> {
    if timeout < MIN_QUEUE_TIMEOUT {
        return Err(QueueError::InvalidTimeout(timeout));
    }
    Ok(())
}

#[async_trait]
impl QueueTransport for SqsQueue {
    async fn receive(&self, token: &CancellationToken) -> Result<Vec<Message>> {
        if token.is_cancelled() {
            return Err(QueueError::Cancelled);
        }

        let request = self
            .client
            .receive_message()
            .queue_url(&self.queue_url)
            .max_number_of_messages(self.batch_size.get() as i32)
            .wait_time_seconds(self.wait_time_seconds())
            .message_attribute_names("All")
            .send();

        let deadline = self.receive_deadline();
        let output = match self.bounded(token, deadline, request).await {
            None if token.is_cancelled() => return Err(QueueError::Cancelled),
            None => return Err(QueueError::ReceiveTimeout(deadline)),
            Some(Err(e)) => return Err(QueueError::Receive(DisplayErrorContext(e).to_string())),
            Some(Ok(output)) => output,
        };

        let messages = output
            .messages
            .unwrap_or_default()
            .into_iter()
            .filter_map(|message| {
                let Some(receipt_handle) = message.receipt_handle else {
                    warn!(
                        queue = %self.name,
                        message_id = ?message.message_id,
                        "message without receipt handle skipped"
                    );
                    return None;
                };
                Some(Message {
                    message_id: message.message_id,
                    body: message.body.unwrap_or_default(),
                    receipt_handle,
                })
            })
            .collect();

        Ok(messages)
    }

    async fn delete(&self, token: &CancellationToken, receipt_handle: &str) -> Result<()> {
        let request = self
            .client
            .delete_message()
            .queue_url(&self.queue_url)
            .receipt_handle(receipt_handle)
            .send();

        let deadline = self.call_deadline();
        match self.bounded(token, deadline, request).await {
            None if token.is_cancelled() => Err(QueueError::Cancelled),
            None => Err(QueueError::Delete(format!("timed out after {:?}", deadline))),
            Some(Err(e)) => Err(QueueError::Delete(DisplayErrorContext(e).to_string())),
            Some(Ok(_)) => Ok(()),
        }
    }

    async fn count(&self, token: &CancellationToken) -> Result<usize> {
        let request = self
            .client
            .get_queue_attributes()
            .queue_url(&self.queue_url)
            .attribute_names(QueueAttributeName::ApproximateNumberOfMessages)
            .attribute_names(QueueAttributeName::ApproximateNumberOfMessagesNotVisible)
            .send();

        let deadline = self.call_deadline();
        let output = match self.bounded(token, deadline, request).await {
            None if token.is_cancelled() => return Err(QueueError::Cancelled),
            None => {
                return Err(QueueError::Attributes(format!(
                    "timed out after {:?}",
                    deadline
                )))
            }
            Some(Err(e)) => return Err(QueueError::Attributes(DisplayErrorContext(e).to_string())),
            Some(Ok(output)) => output,
        };

        let attributes = output.attributes.unwrap_or_default();
        let mut total = 0;
        for name in [
            QueueAttributeName::ApproximateNumberOfMessages,
            QueueAttributeName::ApproximateNumberOfMessagesNotVisible,
        ] {
            if let Some(value) = attributes.get(&name) {
                total += value.parse::<usize>().map_err(|_| QueueError::ParseAttribute {
                    attribute: name.as_str().to_string(),
                    value: value.clone(),
                })?;
            }
        }

        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_sqs::config::{BehaviorVersion, Region};

    fn offline_client() -> Client {
        let config = aws_sdk_sqs::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("us-east-1"))
            .build();
        Client::from_conf(config)
    }

    #[test]
    fn test_config_builder() {
        let config = SqsQueueConfig::new("http://localhost:4566/000000000000/orders")
            .with_name("orders")
            .with_parallel(5)
            .with_timeout(Duration::from_millis(2500));

        assert_eq!(config.name, "orders");
        assert_eq!(config.url, "http://localhost:4566/000000000000/orders");
        assert_eq!(config.parallel, 5);
        assert_eq!(config.timeout, Duration::from_millis(2500));
    }

    #[test]
    fn test_config_defaults() {
        let config = SqsQueueConfig::new("url");
        assert_eq!(config.parallel, 10);
        assert_eq!(config.timeout, Duration::from_millis(1000));
    }

    #[test]
    fn test_new_rejects_parallel_out_of_range() {
        for parallel in [0, 11, 100] {
            let result = SqsQueue::new(
                SqsQueueConfig::new("url").with_parallel(parallel),
                offline_client(),
            );
            assert!(matches!(result, Err(QueueError::InvalidBatchSize(p)) if p == parallel));
        }
    }

    #[test]
    fn test_receive_deadline_exceeds_wait_time() {
        let queue = SqsQueue::new(
            SqsQueueConfig::new("url").with_timeout(Duration::from_millis(2000)),
            offline_client(),
        )
        .unwrap();

        assert_eq!(queue.wait_time_seconds(), 2);
        assert_eq!(queue.receive_deadline(), Duration::from_secs(7));
        assert!(queue.receive_deadline() > Duration::from_secs(queue.wait_time_seconds() as u64));
    }

    #[test]
    fn test_new_rejects_sub_second_timeout() {
        for millis in [0, 1, 999] {
            let result = SqsQueue::new(
                SqsQueueConfig::new("url").with_timeout(Duration::from_millis(millis)),
                offline_client(),
            );
            assert!(
                matches!(result, Err(QueueError::InvalidTimeout(t)) if t == Duration::from_millis(millis))
            );
        }
    }

    #[test]
    fn test_call_deadlines_have_a_floor() {
        let queue = SqsQueue::new(
            SqsQueueConfig::new("url").with_timeout(MIN_QUEUE_TIMEOUT),
            offline_client(),
        )
        .unwrap();

        assert_eq!(queue.wait_time_seconds(), 1);
        assert_eq!(queue.receive_deadline(), Duration::from_secs(6));
        assert_eq!(queue.call_deadline(), Duration::from_secs(5));

        let slow = SqsQueue::new(
            SqsQueueConfig::new("url").with_timeout(Duration::from_secs(30)),
            offline_client(),
        )
        .unwrap();
        assert_eq!(slow.call_deadline(), Duration::from_secs(30));
        assert_eq!(slow.receive_deadline(), Duration::from_secs(25));
    }

    #[tokio::test]
    async fn test_short_call_completes_within_deadlines() {
        let queue = SqsQueue::new(
            SqsQueueConfig::new("url").with_timeout(MIN_QUEUE_TIMEOUT),
            offline_client(),
        )
        .unwrap();
        let token = CancellationToken::new();
        let call = || async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            Ok::<_, ()>(7)
        };

        let received = queue.bounded(&token, queue.receive_deadline(), call()).await;
        assert_eq!(received, Some(Ok(7)));
        let deleted = queue.bounded(&token, queue.call_deadline(), call()).await;
        assert_eq!(deleted, Some(Ok(7)));
    }

    #[test]
    fn test_wait_time_is_capped() {
        let queue = SqsQueue::new(
            SqsQueueConfig::new("url").with_timeout(Duration::from_secs(60)),
            offline_client(),
        )
        .unwrap();

        assert_eq!(queue.wait_time_seconds(), 20);
    }

    #[tokio::test]
    async fn test_receive_cancelled_before_call() {
        let queue = SqsQueue::new(SqsQueueConfig::new("url"), offline_client()).unwrap();
        let token = CancellationToken::new();
        token.cancel();

        let result = queue.receive(&token).await;
        assert!(matches!(result, Err(QueueError::Cancelled)));
    }
}

//! Queue transport layer
//!
//! A [`QueueTransport`] long-polls a bounded batch of messages, deletes a
//! message by its receipt handle once it has been delivered, and reports the
//! approximate backlog.
//!
//! Two transports are provided:
//! - [`SqsQueue`]: AWS SQS
//! - [`InMemoryQueue`]: process-local queue with SQS-like visibility timeouts,
//!   used for local runs and tests
//!
//! Messages that are received but never deleted become visible again once the
//! visibility timeout expires. The consumer relies on this for redelivery, so
//! a transport must never drop a message on its own.

pub mod error;
pub mod memory;
pub mod sqs;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::error;

pub use error::{QueueError, Result};
pub use memory::InMemoryQueue;
pub use sqs::{SqsQueue, SqsQueueConfig, MIN_QUEUE_TIMEOUT};

/// Largest batch a single receive may return (SQS hard limit)
pub const MAX_BATCH_SIZE: usize = 10;

/// A message received from the queue
///
/// Immutable once received. The receipt handle identifies this particular
/// receive and is what `delete` expects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Queue-assigned identifier, used for log context only
    pub message_id: Option<String>,

    /// Raw message body
    pub body: String,

    /// Opaque token required to acknowledge the message
    pub receipt_handle: String,
}

impl Message {
    /// Create a new message
    pub fn new(body: impl Into<String>, receipt_handle: impl Into<String>) -> Self {
        Self {
            message_id: None,
            body: body.into(),
            receipt_handle: receipt_handle.into(),
        }
    }

    /// Set the queue-assigned message id (builder pattern)
    pub fn with_message_id(mut self, message_id: impl Into<String>) -> Self {
        self.message_id = Some(message_id.into());
        self
    }
}

/// Maximum number of messages picked up by one receive call, in 1..=10
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSize(usize);

impl BatchSize {
    /// Validate a batch size
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::InvalidBatchSize`] when `value` is outside 1..=10.
    pub fn new(value: usize) -> Result<Self> {
        if !(1..=MAX_BATCH_SIZE).contains(&value) {
            error!(
                given = value,
                "receive argument: parallel valid values: 1 to {}", MAX_BATCH_SIZE
            );
            return Err(QueueError::InvalidBatchSize(value));
        }
        Ok(Self(value))
    }

    /// The validated size
    pub fn get(self) -> usize {
        self.0
    }
}

/// Interface every queue backend implements
///
/// Implementations must be safe to call concurrently from several workers.
/// Every call observes `token` so shutdown does not wait for a long poll to
/// run out.
#[async_trait]
pub trait QueueTransport: Send + Sync {
    /// Long-poll for up to one batch of messages
    ///
    /// An empty vector means the wait time elapsed with nothing to deliver.
    async fn receive(&self, token: &CancellationToken) -> Result<Vec<Message>>;

    /// Acknowledge a message so it is never redelivered
    async fn delete(&self, token: &CancellationToken, receipt_handle: &str) -> Result<()>;

    /// Approximate number of undeleted messages (visible plus in flight)
    async fn count(&self, token: &CancellationToken) -> Result<usize>;
}

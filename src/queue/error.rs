use std::time::Duration;

use thiserror::Error;

/// Result type for queue transport operations
pub type Result<T> = std::result::Result<T, QueueError>;

/// Errors raised by a queue transport
#[derive(Debug, Error)]
pub enum QueueError {
    /// Batch size outside of 1..=10
    #[error("invalid parallel value: valid values are 1 to 10, given {0}")]
    InvalidBatchSize(usize),

    /// Receive timeout below the one-second long-poll granularity
    #[error("invalid queue timeout {0:?}: at least 1s is required")]
    InvalidTimeout(Duration),

    /// Receive call failed at the transport level
    #[error("receive: {0}")]
    Receive(String),

    /// Receive did not complete within the long-poll safety margin
    #[error("receive timed out after {0:?}")]
    ReceiveTimeout(Duration),

    /// Delete call failed
    #[error("delete: {0}")]
    Delete(String),

    /// The receipt handle does not match any in-flight message
    #[error("unknown receipt handle: {0}")]
    UnknownReceiptHandle(String),

    /// Queue attributes could not be retrieved
    #[error("queue retrieving attribute error: {0}")]
    Attributes(String),

    /// A queue attribute was present but not a number
    #[error("parse attribute error: {attribute}={value}")]
    ParseAttribute { attribute: String, value: String },

    /// The call was abandoned because the consumer is shutting down
    #[error("operation cancelled")]
    Cancelled,
}

use thiserror::Error;

use crate::kvs::KvsError;

/// Result type for gate operations
pub type Result<T> = std::result::Result<T, GateError>;

/// Errors surfaced by the administrative start/stop operations
#[derive(Debug, Error)]
pub enum GateError {
    /// Backing store read or write failed
    #[error("key-value store error: {0}")]
    Store(#[from] KvsError),

    /// Stored record could not be encoded or decoded
    #[error("invalid status record: {0}")]
    Record(#[from] serde_json::Error),
}

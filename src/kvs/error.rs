use thiserror::Error;

/// Result type for key-value store operations
pub type Result<T> = std::result::Result<T, KvsError>;

/// Errors raised by a key-value store
#[derive(Debug, Error)]
pub enum KvsError {
    /// Save was called with an empty key
    #[error("missing key")]
    MissingKey,

    /// Redis command or connection failure
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Store could not be reached for another reason
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

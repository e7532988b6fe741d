//! Key-value store used for the distributed start/stop flag
//!
//! The same store doubles as an ephemeral cache in other deployments, but the
//! values written through [`KeyValueStore::save`] carry no expiry.

pub mod error;
pub mod memory;
pub mod redis_store;

use async_trait::async_trait;

pub use self::error::{KvsError, Result};
pub use self::memory::InMemoryStore;
pub use self::redis_store::RedisStore;

/// Minimal Get/Save interface over a shared string store
///
/// Multiple processes may read and write the same key. No locking is
/// provided; the last writer wins.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read a value; `Ok(None)` when the key is absent
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a value without expiry, overwriting any previous value
    async fn save(&self, key: &str, value: &str) -> Result<()>;
}

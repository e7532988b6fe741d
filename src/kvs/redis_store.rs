use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::{debug, info};

use super::{KeyValueStore, KvsError, Result};

/// Store backed by Redis (or any Redis-compatible cache)
///
/// The connection manager reconnects on its own after a dropped connection,
/// so a cache outage only fails the calls made while it lasts.
#[derive(Clone)]
pub struct RedisStore {
    connection: ConnectionManager,
}

impl RedisStore {
    /// Connect to the Redis instance at `url` (`redis://` or `rediss://`)
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)?;
        let connection = client.get_connection_manager().await?;

        info!(tls = url.starts_with("rediss://"), "connected to Redis");
        Ok(Self { connection })
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut connection = self.connection.clone();
        let value: Option<String> = connection.get(key).await?;
        Ok(value)
    }

    async fn save(&self, key: &str, value: &str) -> Result<()> {
        if key.is_empty() {
            return Err(KvsError::MissingKey);
        }

        let mut connection = self.connection.clone();
        let _: () = connection.set(key, value).await?;
        debug!(key = %key, "value saved without expiry");
        Ok(())
    }
}

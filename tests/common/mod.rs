#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use queue_pusher::kvs::{self, KeyValueStore, KvsError};
use queue_pusher::queue::{self, InMemoryQueue, Message, QueueError, QueueTransport};
use testcontainers::{core::WaitFor, GenericImage, RunnableImage};
use tokio_util::sync::CancellationToken;

/// The Redis Docker image to use for testing
pub const REDIS_IMAGE: &str = "redis";
pub const REDIS_TAG: &str = "7.2-alpine";

/// Default Redis port
pub const REDIS_PORT: u16 = 6379;

/// Create a runnable Redis container
pub fn create_redis_container() -> RunnableImage<GenericImage> {
    let image = GenericImage::new(REDIS_IMAGE, REDIS_TAG)
        .with_wait_for(WaitFor::message_on_stdout("Ready to accept connections"));

    RunnableImage::from(image).with_tag(REDIS_TAG)
}

/// Build a connection URL for the running Redis container
pub fn build_redis_url(host: &str, port: u16) -> String {
    format!("redis://{}:{}", host, port)
}

/// Poll `condition` every 10ms until it holds or `timeout` elapses
pub async fn wait_until<F>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

/// In-memory queue that records every call made through it
pub struct CountingQueue {
    inner: InMemoryQueue,
    receives: AtomicUsize,
    bodies_by_handle: Mutex<HashMap<String, String>>,
    deleted: Mutex<Vec<String>>,
}

impl CountingQueue {
    pub fn new(parallel: usize) -> Self {
        Self::with_visibility_timeout(parallel, Duration::from_secs(30))
    }

    /// Queue that redelivers undeleted messages after `visibility_timeout`
    pub fn with_visibility_timeout(parallel: usize, visibility_timeout: Duration) -> Self {
        Self {
            inner: InMemoryQueue::new(parallel)
                .unwrap()
                .with_wait_time(Duration::from_millis(20))
                .with_visibility_timeout(visibility_timeout),
            receives: AtomicUsize::new(0),
            bodies_by_handle: Mutex::new(HashMap::new()),
            deleted: Mutex::new(Vec::new()),
        }
    }

    pub fn send(&self, body: &str) -> String {
        self.inner.send(body)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn receive_calls(&self) -> usize {
        self.receives.load(Ordering::SeqCst)
    }

    /// Bodies of every deleted message, in deletion order
    pub fn deleted_bodies(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl QueueTransport for CountingQueue {
    async fn receive(&self, token: &CancellationToken) -> queue::Result<Vec<Message>> {
        self.receives.fetch_add(1, Ordering::SeqCst);
        let batch = self.inner.receive(token).await?;

        let mut bodies = self.bodies_by_handle.lock().unwrap();
        for message in &batch {
            bodies.insert(message.receipt_handle.clone(), message.body.clone());
        }
        Ok(batch)
    }

    async fn delete(&self, token: &CancellationToken, receipt_handle: &str) -> queue::Result<()> {
        self.inner.delete(token, receipt_handle).await?;

        let body = self
            .bodies_by_handle
            .lock()
            .unwrap()
            .get(receipt_handle)
            .cloned()
            .unwrap_or_default();
        self.deleted.lock().unwrap().push(body);
        Ok(())
    }

    async fn count(&self, token: &CancellationToken) -> queue::Result<usize> {
        self.inner.count(token).await
    }
}

/// Queue whose receive always fails
#[derive(Default)]
pub struct BrokenQueue {
    receives: AtomicUsize,
}

impl BrokenQueue {
    pub fn receive_calls(&self) -> usize {
        self.receives.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QueueTransport for BrokenQueue {
    async fn receive(&self, _token: &CancellationToken) -> queue::Result<Vec<Message>> {
        self.receives.fetch_add(1, Ordering::SeqCst);
        Err(QueueError::Receive("connection reset".to_string()))
    }

    async fn delete(&self, _token: &CancellationToken, receipt_handle: &str) -> queue::Result<()> {
        Err(QueueError::UnknownReceiptHandle(receipt_handle.to_string()))
    }

    async fn count(&self, _token: &CancellationToken) -> queue::Result<usize> {
        Err(QueueError::Attributes("connection reset".to_string()))
    }
}

/// Key-value store that is always unreachable
pub struct UnavailableStore;

#[async_trait]
impl KeyValueStore for UnavailableStore {
    async fn get(&self, _key: &str) -> kvs::Result<Option<String>> {
        Err(KvsError::Unavailable("connection refused".to_string()))
    }

    async fn save(&self, _key: &str, _value: &str) -> kvs::Result<()> {
        Err(KvsError::Unavailable("connection refused".to_string()))
    }
}

/// Key-value store that serves reads but rejects writes, counting attempts
#[derive(Default)]
pub struct ReadOnlyStore {
    inner: kvs::InMemoryStore,
    saves: AtomicUsize,
}

impl ReadOnlyStore {
    pub async fn with_value(key: &str, value: &str) -> Self {
        let store = Self::default();
        store.inner.save(key, value).await.unwrap();
        store
    }

    pub fn save_calls(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KeyValueStore for ReadOnlyStore {
    async fn get(&self, key: &str) -> kvs::Result<Option<String>> {
        self.inner.get(key).await
    }

    async fn save(&self, _key: &str, _value: &str) -> kvs::Result<()> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        Err(KvsError::Unavailable("read-only replica".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_redis_url() {
        assert_eq!(build_redis_url("localhost", 6380), "redis://localhost:6380");
    }
}

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::{BatchSize, Message, QueueError, QueueTransport, Result};

/// Process-local queue that behaves like SQS for the parts the consumer
/// depends on: long polling, bounded batches and visibility timeouts.
///
/// A received message stays in the queue, invisible, until it is deleted or
/// its visibility timeout runs out. Each receive issues a fresh receipt handle,
/// so a handle from an earlier receive can no longer delete the message.
///
/// # Example
///
/// ```
/// use queue_pusher::queue::InMemoryQueue;
///
/// let queue = InMemoryQueue::new(10).unwrap();
/// queue.send(r#"{"MessageId":"1","Message":"hello"}"#);
/// assert_eq!(queue.len(), 1);
/// ```
pub struct InMemoryQueue {
    entries: Mutex<Vec<Entry>>,
    notify: Notify,
    batch_size: BatchSize,
    wait_time: Duration,
    visibility_timeout: Duration,
}

struct Entry {
    message_id: String,
    body: String,
    receipt_handle: Option<String>,
    visible_at: Instant,
}

impl InMemoryQueue {
    /// Create an empty queue returning at most `parallel` messages per receive
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::InvalidBatchSize`] when `parallel` is outside 1..=10.
    pub fn new(parallel: usize) -> Result<Self> {
        Ok(Self {
            entries: Mutex::new(Vec::new()),
            notify: Notify::new(),
            batch_size: BatchSize::new(parallel)?,
            wait_time: Duration::from_secs(1),
            visibility_timeout: Duration::from_secs(30),
        })
    }

    /// Set how long an empty receive waits for messages (builder pattern)
    pub fn with_wait_time(mut self, wait_time: Duration) -> Self {
        self.wait_time = wait_time;
        self
    }

    /// Set how long a received message stays invisible (builder pattern)
    pub fn with_visibility_timeout(mut self, visibility_timeout: Duration) -> Self {
        self.visibility_timeout = visibility_timeout;
        self
    }

    /// Enqueue a message and return its id
    pub fn send(&self, body: impl Into<String>) -> String {
        let message_id = Uuid::new_v4().to_string();
        self.lock().push(Entry {
            message_id: message_id.clone(),
            body: body.into(),
            receipt_handle: None,
            visible_at: Instant::now(),
        });
        self.notify.notify_waiters();
        message_id
    }

    /// Number of undeleted messages, visible or in flight
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether every message has been deleted
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Take up to one batch of visible messages and hide them.
    ///
    /// Returns the batch together with the earliest instant at which a hidden
    /// message becomes visible again, if any.
    fn take_visible(&self) -> (Vec<Message>, Option<Instant>) {
        let now = Instant::now();
        let hidden_until = now + self.visibility_timeout;
        let mut entries = self.lock();
        let mut batch = Vec::new();
        let mut next_visible: Option<Instant> = None;

        for entry in entries.iter_mut() {
            if entry.visible_at > now {
                next_visible = Some(match next_visible {
                    Some(at) => at.min(entry.visible_at),
                    None => entry.visible_at,
                });
                continue;
            }
            if batch.len() == self.batch_size.get() {
                continue;
            }

            let receipt_handle = Uuid::new_v4().to_string();
            entry.receipt_handle = Some(receipt_handle.clone());
            entry.visible_at = hidden_until;
            batch.push(
                Message::new(entry.body.clone(), receipt_handle)
                    .with_message_id(entry.message_id.clone()),
            );
        }

        (batch, next_visible)
    }
}

#[async_trait]
impl QueueTransport for InMemoryQueue {
    async fn receive(&self, token: &CancellationToken) -> Result<Vec<Message>> {
        let deadline = Instant::now() + self.wait_time;

        loop {
            // Register interest before looking so a concurrent send is not missed.
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let (batch, next_visible) = self.take_visible();
            if !batch.is_empty() {
                return Ok(batch);
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(Vec::new());
            }
            let wake_at = next_visible.map_or(deadline, |at| at.min(deadline));

            tokio::select! {
                _ = token.cancelled() => return Err(QueueError::Cancelled),
                _ = tokio::time::sleep_until(wake_at) => {}
                _ = &mut notified => {}
            }
        }
    }

    async fn delete(&self, _token: &CancellationToken, receipt_handle: &str) -> Result<()> {
        let mut entries = self.lock();
        let position = entries
            .iter()
            .position(|entry| entry.receipt_handle.as_deref() == Some(receipt_handle))
            .ok_or_else(|| QueueError::UnknownReceiptHandle(receipt_handle.to_string()))?;
        entries.remove(position);
        Ok(())
    }

    async fn count(&self, _token: &CancellationToken) -> Result<usize> {
        Ok(self.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queue(parallel: usize) -> InMemoryQueue {
        InMemoryQueue::new(parallel)
            .unwrap()
            .with_wait_time(Duration::from_millis(20))
    }

    #[test]
    fn test_rejects_out_of_range_parallel() {
        assert!(matches!(
            InMemoryQueue::new(0),
            Err(QueueError::InvalidBatchSize(0))
        ));
        assert!(matches!(
            InMemoryQueue::new(11),
            Err(QueueError::InvalidBatchSize(11))
        ));
    }

    #[tokio::test]
    async fn test_receive_is_bounded_by_batch_size() {
        let queue = queue(2);
        let token = CancellationToken::new();
        for i in 0..5 {
            queue.send(format!("m{}", i));
        }

        let first = queue.receive(&token).await.unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].body, "m0");
        assert_eq!(first[1].body, "m1");

        let second = queue.receive(&token).await.unwrap();
        assert_eq!(second.len(), 2);
        assert_eq!(second[0].body, "m2");
    }

    #[tokio::test]
    async fn test_receive_empty_returns_after_wait_time() {
        let queue = queue(10);
        let token = CancellationToken::new();

        let messages = queue.receive(&token).await.unwrap();
        assert!(messages.is_empty());
    }

    #[tokio::test]
    async fn test_receive_wakes_on_send() {
        let queue = std::sync::Arc::new(
            InMemoryQueue::new(10)
                .unwrap()
                .with_wait_time(Duration::from_secs(5)),
        );
        let token = CancellationToken::new();

        let sender = std::sync::Arc::clone(&queue);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            sender.send("late");
        });

        let messages = tokio::time::timeout(Duration::from_secs(2), queue.receive(&token))
            .await
            .expect("receive should wake up when a message arrives")
            .unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].body, "late");
    }

    #[tokio::test]
    async fn test_receive_observes_cancellation() {
        let queue = InMemoryQueue::new(10)
            .unwrap()
            .with_wait_time(Duration::from_secs(30));
        let token = CancellationToken::new();
        token.cancel();

        let result = queue.receive(&token).await;
        assert!(matches!(result, Err(QueueError::Cancelled)));
    }

    #[tokio::test]
    async fn test_undeleted_message_is_redelivered_after_visibility_timeout() {
        let queue = queue(10).with_visibility_timeout(Duration::from_millis(30));
        let token = CancellationToken::new();
        queue.send("again");

        let first = queue.receive(&token).await.unwrap();
        assert_eq!(first.len(), 1);

        // Hidden while in flight
        let hidden = queue.receive(&token).await.unwrap();
        assert!(hidden.is_empty());

        tokio::time::sleep(Duration::from_millis(40)).await;
        let second = queue.receive(&token).await.unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].body, "again");
        assert_ne!(second[0].receipt_handle, first[0].receipt_handle);
    }

    #[tokio::test]
    async fn test_delete_removes_message() {
        let queue = queue(10);
        let token = CancellationToken::new();
        queue.send("bye");

        let messages = queue.receive(&token).await.unwrap();
        queue
            .delete(&token, &messages[0].receipt_handle)
            .await
            .unwrap();
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_delete_unknown_handle_fails() {
        let queue = queue(10);
        let token = CancellationToken::new();

        let result = queue.delete(&token, "missing").await;
        assert!(matches!(result, Err(QueueError::UnknownReceiptHandle(_))));
    }

    #[tokio::test]
    async fn test_count_includes_in_flight_messages() {
        let queue = queue(10);
        let token = CancellationToken::new();
        assert_eq!(queue.count(&token).await.unwrap(), 0);

        for i in 0..3 {
            queue.send(format!("m{}", i));
        }
        assert_eq!(queue.count(&token).await.unwrap(), 3);

        let messages = queue.receive(&token).await.unwrap();
        assert_eq!(queue.count(&token).await.unwrap(), 3);

        queue
            .delete(&token, &messages[0].receipt_handle)
            .await
            .unwrap();
        assert_eq!(queue.count(&token).await.unwrap(), 2);
    }
}

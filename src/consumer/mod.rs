//! Queue consumption engine
//!
//! A [`Consumer`] runs a fixed pool of workers under one cancellation token.
//! Each worker repeats the same cycle:
//!
//! 1. Check the [`RuntimeGate`](crate::gate::RuntimeGate); while stopped, sleep
//!    and check again without polling the queue.
//! 2. Long-poll one batch from the queue.
//! 3. Hand the batch to the configured [`ProcessingStrategy`], which calls
//!    [`Consumer::send_and_ack`] for every message.
//!
//! A message is deleted only after the sink accepted it. Everything else is
//! left for the queue to redeliver once its visibility timeout expires, so
//! delivery is at-least-once.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use queue_pusher::consumer::{Consumer, ConsumerConfig};
//! use queue_pusher::forwarder::{ForwarderConfig, HttpForwarder};
//! use queue_pusher::gate::RuntimeGate;
//! use queue_pusher::kvs::InMemoryStore;
//! use queue_pusher::queue::InMemoryQueue;
//! use queue_pusher::telemetry::Metrics;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let metrics = Arc::new(Metrics::new());
//! let queue = Arc::new(InMemoryQueue::new(10)?);
//! let forwarder = Arc::new(HttpForwarder::new(
//!     ForwarderConfig::new("http://localhost:3000/events"),
//!     metrics.clone(),
//! )?);
//! let gate = Arc::new(RuntimeGate::new("orders", Arc::new(InMemoryStore::new())));
//!
//! let consumer = Consumer::new(ConsumerConfig::new(), queue, forwarder, gate, metrics)?;
//! consumer.start(CancellationToken::new()).await;
//! # Ok(())
//! # }
//! ```

pub mod engine;
pub mod error;
pub mod sampler;
pub mod strategy;

pub use engine::{default_worker_count, Consumer, ConsumerConfig};
pub use error::ConsumerError;
pub use sampler::TelemetrySampler;
pub use strategy::{MessageHandler, ProcessingStrategy};

//! How a received batch is handed to the per-message action

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use futures::future::BoxFuture;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::queue::Message;

use super::error::ConsumerError;

/// Per-message action invoked by a strategy
///
/// Failures are handled inside the action, so it returns nothing.
pub type MessageHandler =
    Arc<dyn Fn(CancellationToken, Message) -> BoxFuture<'static, ()> + Send + Sync>;

/// Batch processing strategy, selected by tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingStrategy {
    /// `"sync"`: one message at a time, in batch order
    Sequential,
    /// `"async"`: one task per message, joined before returning
    Concurrent,
}

impl ProcessingStrategy {
    /// Look up a strategy by its tag
    ///
    /// # Errors
    ///
    /// Returns [`ConsumerError::StrategyNotFound`] for any tag other than
    /// `sync` or `async`.
    pub fn resolve(tag: &str) -> Result<Self, ConsumerError> {
        match tag {
            "sync" => Ok(ProcessingStrategy::Sequential),
            "async" => Ok(ProcessingStrategy::Concurrent),
            other => Err(ConsumerError::StrategyNotFound(other.to_string())),
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            ProcessingStrategy::Sequential => "sync",
            ProcessingStrategy::Concurrent => "async",
        }
    }

    /// Run `handler` over every message of `batch`
    ///
    /// Returns once every message has been handled. A sequential run stops
    /// early when `token` is cancelled and leaves the rest for redelivery.
    pub async fn process(
        &self,
        token: &CancellationToken,
        batch: Vec<Message>,
        handler: MessageHandler,
    ) {
        match self {
            ProcessingStrategy::Sequential => {
                for message in batch {
                    if token.is_cancelled() {
                        debug!("shutdown requested, leaving remaining messages for redelivery");
                        break;
                    }
                    handler(token.clone(), message).await;
                }
            }
            ProcessingStrategy::Concurrent => {
                let mut tasks = JoinSet::new();
                for message in batch {
                    tasks.spawn(handler(token.clone(), message));
                }

                while let Some(joined) = tasks.join_next().await {
                    if let Err(e) = joined {
                        error!(error = %e, "message task failed");
                    }
                }
            }
        }
    }
}

impl FromStr for ProcessingStrategy {
    type Err = ConsumerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::resolve(s)
    }
}

impl fmt::Display for ProcessingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

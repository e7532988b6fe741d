//! Forwarding of queue messages to the downstream HTTP sink
//!
//! A message body is decoded into a [`ForwardRequest`] and POSTed as JSON:
//!
//! ```text
//! queue body:  {"MessageId":"1","Message":"hello","Timestamp":"2024-01-01T00:00:00Z"}
//! wire body:   {"id":"1","msg":"hello","timestamp":"2024-01-01T00:00:00Z"}
//! ```
//!
//! Empty fields are left out of the wire body. Any non-success result is an
//! error, and the caller must leave the message on the queue.

pub mod client;
pub mod error;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::queue::Message;

pub use client::{ForwarderConfig, HttpForwarder};
pub use error::{ForwardError, Outcome};

/// Payload sent to the downstream endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ForwardRequest {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,

    #[serde(rename = "msg", skip_serializing_if = "String::is_empty")]
    pub message: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub timestamp: String,
}

/// Field names accepted in a queue message body
#[derive(Deserialize)]
struct MessageBody {
    #[serde(rename = "MessageId", alias = "id", default)]
    id: Option<String>,

    #[serde(rename = "Message", alias = "message", alias = "msg", default)]
    message: Option<String>,

    #[serde(rename = "Timestamp", alias = "timestamp", default)]
    timestamp: Option<String>,
}

impl ForwardRequest {
    pub fn new(
        id: impl Into<String>,
        message: impl Into<String>,
        timestamp: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            message: message.into(),
            timestamp: timestamp.into(),
        }
    }

    /// Decode a queue message body
    ///
    /// Missing or null fields decode as empty strings. Unknown fields are
    /// ignored.
    ///
    /// # Errors
    ///
    /// Fails when the body is not a JSON object or a known field is not a
    /// string.
    pub fn from_body(body: &str) -> Result<Self, serde_json::Error> {
        let value: serde_json::Value = serde_json::from_str(body)?;
        if !value.is_object() {
            return Err(<serde_json::Error as serde::de::Error>::custom(
                "message body is not a JSON object",
            ));
        }

        let decoded: MessageBody = serde_json::from_value(value)?;
        Ok(Self {
            id: decoded.id.unwrap_or_default(),
            message: decoded.message.unwrap_or_default(),
            timestamp: decoded.timestamp.unwrap_or_default(),
        })
    }
}

/// Delivers one message downstream
///
/// `Ok(())` means the sink accepted the message and it may be deleted.
#[async_trait]
pub trait MessageForwarder: Send + Sync {
    async fn forward(&self, token: &CancellationToken, message: &Message)
        -> Result<(), ForwardError>;
}

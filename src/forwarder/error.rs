//! Error types for the forwarding layer

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Classified result of one forward attempt
///
/// Drives both the acknowledgement decision and the counter incremented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    ClientError(u16),
    ServerError(u16),
    UnexpectedStatus(u16),
    Timeout,
    TransportError,
    ParseError,
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success)
    }

    /// Classify a response status
    ///
    /// With `strict_ok` only 200 counts as success and other 2xx codes are
    /// reported as unexpected.
    pub fn from_status(status: u16, strict_ok: bool) -> Self {
        match status {
            200 => Outcome::Success,
            200..=299 if !strict_ok => Outcome::Success,
            400..=499 => Outcome::ClientError(status),
            500..=u16::MAX => Outcome::ServerError(status),
            _ => Outcome::UnexpectedStatus(status),
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Success => f.write_str("success"),
            Outcome::ClientError(status) => write!(f, "client error ({})", status),
            Outcome::ServerError(status) => write!(f, "server error ({})", status),
            Outcome::UnexpectedStatus(status) => write!(f, "unexpected status ({})", status),
            Outcome::Timeout => f.write_str("timeout"),
            Outcome::TransportError => f.write_str("transport error"),
            Outcome::ParseError => f.write_str("parse error"),
        }
    }
}

/// Errors returned by a message forwarder
///
/// Every variant means the message was not delivered and must not be
/// acknowledged.
#[derive(Debug, Error)]
pub enum ForwardError {
    /// Message body is not a JSON object
    #[error("failed to parse message body: {0}")]
    Parse(#[from] serde_json::Error),

    /// No response within the configured timeout
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// Connection, TLS or protocol failure
    #[error("transport error: {0}")]
    Transport(String),

    /// Shutdown requested while the request was in flight
    #[error("request cancelled")]
    Cancelled,

    #[error("client error (status {status}): {body}")]
    ClientStatus { status: u16, body: String },

    #[error("server error (status {status}): {body}")]
    ServerStatus { status: u16, body: String },

    #[error("unexpected status {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    /// Forwarder could not be built
    #[error("invalid forwarder configuration: {0}")]
    Configuration(String),
}

impl ForwardError {
    /// Build the error matching a non-success response
    pub fn from_response(status: u16, body: String, strict_ok: bool) -> Self {
        match Outcome::from_status(status, strict_ok) {
            Outcome::ClientError(status) => ForwardError::ClientStatus { status, body },
            Outcome::ServerError(status) => ForwardError::ServerStatus { status, body },
            _ => ForwardError::UnexpectedStatus { status, body },
        }
    }

    /// Outcome this error was classified as
    pub fn outcome(&self) -> Outcome {
        match self {
            ForwardError::Parse(_) => Outcome::ParseError,
            ForwardError::Timeout(_) => Outcome::Timeout,
            ForwardError::Transport(_)
            | ForwardError::Cancelled
            | ForwardError::Configuration(_) => Outcome::TransportError,
            ForwardError::ClientStatus { status, .. } => Outcome::ClientError(*status),
            ForwardError::ServerStatus { status, .. } => Outcome::ServerError(*status),
            ForwardError::UnexpectedStatus { status, .. } => Outcome::UnexpectedStatus(*status),
        }
    }
}

//! HTTP forwarder backed by reqwest

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::queue::Message;
use crate::telemetry::{names, Metrics};

use super::error::{ForwardError, Outcome};
use super::{ForwardRequest, MessageForwarder};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_USER_AGENT: &str = concat!("queue-pusher/", env!("CARGO_PKG_VERSION"));

/// Configuration for the downstream HTTP sink
#[derive(Debug, Clone)]
pub struct ForwarderConfig {
    /// URL every message is POSTed to
    pub endpoint: String,
    /// Whole-request timeout
    pub timeout: Duration,
    /// Accept only HTTP 200 as success
    pub strict_ok: bool,
    pub user_agent: String,
}

impl ForwarderConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            timeout: DEFAULT_TIMEOUT,
            strict_ok: false,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }

    /// Set the request timeout (builder pattern)
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Only treat HTTP 200 as success (builder pattern)
    pub fn with_strict_ok(mut self, strict_ok: bool) -> Self {
        self.strict_ok = strict_ok;
        self
    }

    /// Set the User-Agent header (builder pattern)
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

/// Forwards messages to a single HTTP endpoint
///
/// Every call records `consumers.pusher.http.time`, then exactly one of
/// `consumers.pusher.success` or `consumers.pusher.errors`.
pub struct HttpForwarder {
    http_client: Client,
    config: ForwarderConfig,
    metrics: Arc<Metrics>,
}

impl HttpForwarder {
    /// Create a forwarder
    ///
    /// # Errors
    ///
    /// Returns [`ForwardError::Configuration`] if the endpoint is empty or the
    /// HTTP client cannot be built.
    pub fn new(config: ForwarderConfig, metrics: Arc<Metrics>) -> Result<Self, ForwardError> {
        if config.endpoint.is_empty() {
            return Err(ForwardError::Configuration(
                "target endpoint must not be empty".to_string(),
            ));
        }

        let http_client = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| {
                ForwardError::Configuration(format!("failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            http_client,
            config,
            metrics,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }

    async fn post(&self, request: &ForwardRequest) -> Result<(), ForwardError> {
        let response = self
            .http_client
            .post(&self.config.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ForwardError::Timeout(self.config.timeout)
                } else {
                    ForwardError::Transport(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        self.record_status(status);

        if Outcome::from_status(status, self.config.strict_ok).is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_else(|_| String::new());
        Err(ForwardError::from_response(
            status,
            body,
            self.config.strict_ok,
        ))
    }

    fn record_status(&self, status: u16) {
        match status {
            200..=299 => self.metrics.increment_counter(names::PUSHER_HTTP_2XX),
            400..=499 => self.metrics.increment_counter(names::PUSHER_HTTP_4XX),
            500..=599 => self.metrics.increment_counter(names::PUSHER_HTTP_5XX),
            _ => {}
        }
    }
}

#[async_trait]
impl MessageForwarder for HttpForwarder {
    async fn forward(
        &self,
        token: &CancellationToken,
        message: &Message,
    ) -> Result<(), ForwardError> {
        let message_id = message.message_id.as_deref().unwrap_or_default();

        let request = match ForwardRequest::from_body(&message.body) {
            Ok(request) => request,
            Err(e) => {
                error!(
                    message_id = %message_id,
                    body = %message.body,
                    error = %e,
                    "failed to parse message body"
                );
                self.metrics.increment_counter(names::PUSHER_ERRORS);
                return Err(e.into());
            }
        };

        let started = Instant::now();
        let result = tokio::select! {
            biased;
            _ = token.cancelled() => Err(ForwardError::Cancelled),
            result = self.post(&request) => result,
        };
        let elapsed = started.elapsed();
        self.metrics
            .record_execution_time(names::PUSHER_HTTP_TIME, elapsed);

        match &result {
            Ok(()) => {
                self.metrics.increment_counter(names::PUSHER_SUCCESS);
                debug!(
                    message_id = %message_id,
                    id = %request.id,
                    elapsed = ?elapsed,
                    "message forwarded"
                );
            }
            Err(ForwardError::Timeout(timeout)) => {
                self.metrics.increment_counter(names::PUSHER_ERRORS);
                self.metrics.increment_counter(names::PUSHER_HTTP_TIMEOUT);
                warn!(
                    message_id = %message_id,
                    id = %request.id,
                    endpoint = %self.config.endpoint,
                    timeout = ?timeout,
                    "request timed out, the endpoint may still process it and receive a duplicate on redelivery"
                );
            }
            Err(e) => {
                self.metrics.increment_counter(names::PUSHER_ERRORS);
                error!(
                    message_id = %message_id,
                    id = %request.id,
                    endpoint = %self.config.endpoint,
                    outcome = %e.outcome(),
                    elapsed = ?elapsed,
                    error = %e,
                    "failed to forward message"
                );
            }
        }

        result
    }
}

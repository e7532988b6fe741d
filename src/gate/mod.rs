//! Distributed start/stop switch
//!
//! Every consumer instance sharing an application name reads the same record
//! from the key-value store before each receive cycle. Flipping it to
//! `stopped` pauses polling everywhere without a redeploy.
//!
//! Stored record:
//!
//! ```text
//! key:   consumers:<app-name>:v1
//! value: {"status":"started"} | {"status":"stopped"}
//! ```
//!
//! The key never expires. Reads fail open: an absent or unreadable record
//! means `started`, so a store outage cannot halt processing.

pub mod error;

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::kvs::KeyValueStore;

pub use error::{GateError, Result};

/// Run state shared by all instances of one application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppStatus {
    #[default]
    Started,
    Stopped,
}

impl AppStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppStatus::Started => "started",
            AppStatus::Stopped => "stopped",
        }
    }
}

impl fmt::Display for AppStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted form of the switch, also returned by the admin endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AppStatusRecord {
    pub status: AppStatus,
}

impl AppStatusRecord {
    pub fn new(status: AppStatus) -> Self {
        Self { status }
    }
}

/// Store key for an application's switch
pub fn gate_key(app_name: &str) -> String {
    format!("consumers:{}:v1", app_name)
}

/// Reads and flips the shared start/stop switch
pub struct RuntimeGate {
    store: Arc<dyn KeyValueStore>,
    key: String,
    /// Set once an absent record has been reported; cleared when one is read
    missing_reported: AtomicBool,
}

impl RuntimeGate {
    pub fn new(app_name: &str, store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            key: gate_key(app_name),
            missing_reported: AtomicBool::new(false),
        }
    }

    /// The store key this gate reads and writes
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Current status, `Started` when the record is absent or unreadable
    pub async fn app_status(&self) -> AppStatus {
        match self.read().await {
            Ok(Some(status)) => {
                self.missing_reported.store(false, Ordering::Relaxed);
                status
            }
            Ok(None) => {
                if self.missing_reported.swap(true, Ordering::Relaxed) {
                    debug!(key = %self.key, "no status record found, started by default");
                } else {
                    warn!(key = %self.key, "no status record found, started by default");
                }
                AppStatus::Started
            }
            Err(e) => {
                warn!(
                    key = %self.key,
                    error = %e,
                    "failed to retrieve status from key-value store, started by default"
                );
                AppStatus::Started
            }
        }
    }

    /// Resume polling on every instance
    ///
    /// # Errors
    ///
    /// Fails when the current record cannot be read or the new one cannot be
    /// written. Nothing is written when the stored status is already `started`.
    pub async fn start(&self) -> Result<()> {
        self.switch_to(AppStatus::Started).await
    }

    /// Pause polling on every instance
    ///
    /// # Errors
    ///
    /// Same as [`RuntimeGate::start`].
    pub async fn stop(&self) -> Result<()> {
        self.switch_to(AppStatus::Stopped).await
    }

    async fn read(&self) -> Result<Option<AppStatus>> {
        let Some(raw) = self.store.get(&self.key).await? else {
            return Ok(None);
        };
        let record: AppStatusRecord = serde_json::from_str(&raw)?;
        Ok(Some(record.status))
    }

    async fn switch_to(&self, target: AppStatus) -> Result<()> {
        if self.read().await? == Some(target) {
            warn!(key = %self.key, "consumer already {}", target);
            return Ok(());
        }

        let record = serde_json::to_string(&AppStatusRecord::new(target))?;
        self.store.save(&self.key, &record).await?;

        warn!(key = %self.key, "consumer switched to {}", target);
        Ok(())
    }
}

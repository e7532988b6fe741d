//! Counters, gauges and timers emitted by the consumer
//!
//! [`Metrics`] is built once by the composition root and shared by reference.
//! Every record is forwarded to the `metrics` facade, so whichever recorder
//! the process installs receives it, and is also kept in an in-process
//! snapshot that logs and tests can read back.
//!
//! Every series carries an `app` label with the application name, so several
//! consumers reporting to one recorder stay apart.
//!
//! Only registered names are accepted. Recording an unknown name logs a
//! warning and is otherwise ignored: telemetry never affects message handling.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tracing::warn;

/// Label value used until an application name is set
pub const DEFAULT_APP_LABEL: &str = "queue-pusher";

/// Metric names emitted by this crate
pub mod names {
    pub const PUSHER_SUCCESS: &str = "consumers.pusher.success";
    pub const PUSHER_ERRORS: &str = "consumers.pusher.errors";
    pub const PUSHER_HTTP_2XX: &str = "consumers.pusher.http.20x";
    pub const PUSHER_HTTP_4XX: &str = "consumers.pusher.http.40x";
    pub const PUSHER_HTTP_5XX: &str = "consumers.pusher.http.50x";
    pub const PUSHER_HTTP_TIMEOUT: &str = "consumers.pusher.http.timeout";
    pub const PUSHER_HTTP_TIME: &str = "consumers.pusher.http.time";
    pub const CONSUMER_WORKERS: &str = "consumers.workers";
    pub const QUEUE_DEPTH: &str = "consumers.queue.depth";
}

const COUNTERS: &[(&str, &str)] = &[
    (names::PUSHER_SUCCESS, "Messages forwarded and accepted downstream"),
    (names::PUSHER_ERRORS, "Messages that could not be forwarded"),
    (names::PUSHER_HTTP_2XX, "Downstream responses with a 2xx status"),
    (names::PUSHER_HTTP_4XX, "Downstream responses with a 4xx status"),
    (names::PUSHER_HTTP_5XX, "Downstream responses with a 5xx status"),
    (
        names::PUSHER_HTTP_TIMEOUT,
        "Downstream calls that timed out; the sink may still have applied them",
    ),
];

const GAUGES: &[(&str, &str)] = &[
    (names::CONSUMER_WORKERS, "Configured worker count"),
    (names::QUEUE_DEPTH, "Approximate number of undeleted messages"),
];

const HISTOGRAMS: &[(&str, &str)] = &[(
    names::PUSHER_HTTP_TIME,
    "Downstream call latency in seconds, recorded for every outcome",
)];

#[derive(Default)]
struct Timer {
    count: AtomicU64,
    total_micros: AtomicU64,
}

/// Registry of the metrics this crate emits
pub struct Metrics {
    app: String,
    counters: HashMap<&'static str, AtomicU64>,
    gauges: HashMap<&'static str, AtomicU64>,
    timers: HashMap<&'static str, Timer>,
}

impl Metrics {
    /// Register the default metric set and describe it to the installed recorder
    pub fn new() -> Self {
        for (name, help) in COUNTERS {
            metrics::describe_counter!(*name, *help);
        }
        for (name, help) in GAUGES {
            metrics::describe_gauge!(*name, *help);
        }
        for (name, help) in HISTOGRAMS {
            metrics::describe_histogram!(*name, metrics::Unit::Seconds, *help);
        }

        Self {
            app: DEFAULT_APP_LABEL.to_string(),
            counters: COUNTERS.iter().map(|(name, _)| (*name, AtomicU64::new(0))).collect(),
            gauges: GAUGES.iter().map(|(name, _)| (*name, AtomicU64::new(0))).collect(),
            timers: HISTOGRAMS.iter().map(|(name, _)| (*name, Timer::default())).collect(),
        }
    }

    /// Set the `app` label attached to every series (builder pattern)
    pub fn with_app_name(mut self, app: impl Into<String>) -> Self {
        self.app = app.into();
        self
    }

    /// Value of the `app` label
    pub fn app_name(&self) -> &str {
        &self.app
    }

    /// Add one to a counter
    pub fn increment_counter(&self, name: &str) {
        match self.counters.get_key_value(name) {
            Some((key, value)) => {
                value.fetch_add(1, Ordering::Relaxed);
                metrics::counter!(*key, "app" => self.app.clone()).increment(1);
            }
            None => warn!(metric = %name, "counter not registered, skipping"),
        }
    }

    /// Record a duration in a histogram
    pub fn record_execution_time(&self, name: &str, elapsed: Duration) {
        match self.timers.get_key_value(name) {
            Some((key, timer)) => {
                let micros = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
                timer.count.fetch_add(1, Ordering::Relaxed);
                // Saturates; the closure never returns None
                let _ = timer
                    .total_micros
                    .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |total| {
                        Some(total.saturating_add(micros))
                    });
                metrics::histogram!(*key, "app" => self.app.clone()).record(elapsed.as_secs_f64());
            }
            None => warn!(metric = %name, "histogram not registered, skipping"),
        }
    }

    /// Set a gauge to an absolute value
    pub fn set_gauge(&self, name: &str, value: u64) {
        match self.gauges.get_key_value(name) {
            Some((key, gauge)) => {
                gauge.store(value, Ordering::Relaxed);
                metrics::gauge!(*key, "app" => self.app.clone()).set(value as f64);
            }
            None => warn!(metric = %name, "gauge not registered, skipping"),
        }
    }

    /// Current value of a counter, 0 for unknown names
    pub fn counter(&self, name: &str) -> u64 {
        self.counters
            .get(name)
            .map_or(0, |value| value.load(Ordering::Relaxed))
    }

    /// Last value set on a gauge, 0 for unknown names
    pub fn gauge(&self, name: &str) -> u64 {
        self.gauges
            .get(name)
            .map_or(0, |value| value.load(Ordering::Relaxed))
    }

    /// Number of durations recorded in a histogram
    pub fn timer_count(&self, name: &str) -> u64 {
        self.timers
            .get(name)
            .map_or(0, |timer| timer.count.load(Ordering::Relaxed))
    }

    /// Sum of durations recorded in a histogram
    pub fn timer_total(&self, name: &str) -> Duration {
        self.timers.get(name).map_or(Duration::ZERO, |timer| {
            Duration::from_micros(timer.total_micros.load(Ordering::Relaxed))
        })
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

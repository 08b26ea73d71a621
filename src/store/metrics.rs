//! Metrics for remote calls issued by the session store
//!
//! Every remote call is wrapped in a [`RemoteCallMetrics`] guard, labeled by
//! the store operation that issued it.
//!
//! # Metrics
//!
//! - `sqlbot_remote_calls_total`: Counter of remote calls issued
//! - `sqlbot_remote_call_duration_seconds`: Histogram of call duration by status
//! - `sqlbot_remote_call_failures_total`: Counter of failed calls
//! - `sqlbot_remote_calls_in_flight`: Gauge of outstanding calls
//!
//! # Examples
//!
//! ```
//! use sqlbot::store::metrics::RemoteCallMetrics;
//!
//! let metrics = RemoteCallMetrics::start("list_sessions");
//! metrics.record_success();
//! ```

use metrics::{decrement_gauge, histogram, increment_counter, increment_gauge};
use std::cell::Cell;
use std::time::Instant;

/// Metrics collection for a single remote call
///
/// Increments the in-flight gauge on creation and releases it exactly once,
/// either through `record_success`/`record_failure` or on drop when the
/// call's future was cancelled before it settled.
#[derive(Debug)]
pub struct RemoteCallMetrics {
    operation: &'static str,
    start: Instant,
    recorded: Cell<bool>,
}

impl RemoteCallMetrics {
    /// Starts tracking a remote call issued by `operation`
    pub fn start(operation: &'static str) -> Self {
        increment_counter!("sqlbot_remote_calls_total", "operation" => operation);
        increment_gauge!("sqlbot_remote_calls_in_flight", 1.0, "operation" => operation);

        Self {
            operation,
            start: Instant::now(),
            recorded: Cell::new(false),
        }
    }

    /// Records that the call succeeded
    pub fn record_success(&self) {
        self.finish("success");
    }

    /// Records that the call failed
    pub fn record_failure(&self) {
        if self.recorded.get() {
            return;
        }
        increment_counter!(
            "sqlbot_remote_call_failures_total",
            "operation" => self.operation
        );
        self.finish("failure");
    }

    /// Records the outcome of `result`
    pub fn record<T, E>(&self, result: &Result<T, E>) {
        match result {
            Ok(_) => self.record_success(),
            Err(_) => self.record_failure(),
        }
    }

    /// Operation label
    pub fn operation(&self) -> &'static str {
        self.operation
    }

    fn finish(&self, status: &'static str) {
        if self.recorded.get() {
            return;
        }
        self.recorded.set(true);

        histogram!(
            "sqlbot_remote_call_duration_seconds",
            self.start.elapsed().as_secs_f64(),
            "operation" => self.operation,
            "status" => status
        );
        decrement_gauge!("sqlbot_remote_calls_in_flight", 1.0, "operation" => self.operation);
    }
}

impl Drop for RemoteCallMetrics {
    fn drop(&mut self) {
        if !self.recorded.get() {
            decrement_gauge!("sqlbot_remote_calls_in_flight", 1.0, "operation" => self.operation);
        }
    }
}

/// Initializes the metrics exporter for Prometheus
///
/// Only has an effect when compiled with the `prometheus` feature.
pub fn init_metrics_exporter() {
    #[cfg(feature = "prometheus")]
    {
        use metrics_exporter_prometheus::PrometheusBuilder;
        let _ = PrometheusBuilder::new().install().map_err(|e| {
            tracing::warn!("Failed to install Prometheus exporter: {}", e);
        });
    }
}

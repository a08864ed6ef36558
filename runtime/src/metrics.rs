//! Prometheus metrics for booking and administration.
//!
//! This module provides metric collection for:
//! - Submissions and their outcome
//! - Rejections by reason code
//! - Reservation store failures by operation
//! - Commit latency (confirm plus write)
//! - Administrative deletions
//!
//! # Example
//!
//! ```rust,no_run
//! use slotbook_runtime::metrics::MetricsServer;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut server = MetricsServer::new("0.0.0.0:9090".parse()?);
//! server.start()?;
//!
//! if let Some(text) = server.render() {
//!     println!("{text}");
//! }
//! # Ok(())
//! # }
//! ```

use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

// Re-export metrics macros for use in other modules
pub use metrics::{counter, gauge, histogram};

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Prometheus metrics recorder and renderer.
///
/// Installs the process-wide recorder and renders the scrape text on demand.
pub struct MetricsServer {
    addr: SocketAddr,
    handle: Option<PrometheusHandle>,
}

impl MetricsServer {
    /// Create a new metrics server for `addr`.
    #[must_use]
    pub const fn new(addr: SocketAddr) -> Self {
        Self { addr, handle: None }
    }

    /// Describe every metric and install the Prometheus recorder.
    ///
    /// # Errors
    ///
    /// Returns error if the exporter cannot be built or installed.
    ///
    /// # Note
    ///
    /// A recorder that is already installed (e.g. by an earlier test) is not
    /// an error; [`Self::render`] then returns `None`.
    pub fn start(&mut self) -> Result<(), MetricsError> {
        register_metrics();

        let builder = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                &[0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0],
            )
            .map_err(|e| MetricsError::Build(e.to_string()))?;

        match builder.install_recorder() {
            Ok(handle) => {
                self.handle = Some(handle);
                tracing::info!(addr = %self.addr, "Metrics recorder installed");
                Ok(())
            }
            Err(e) => {
                let err_msg = e.to_string();
                if err_msg.contains("already initialized") {
                    tracing::warn!("Metrics recorder already initialized, skipping re-initialization");
                    Ok(())
                } else {
                    Err(MetricsError::Install(err_msg))
                }
            }
        }
    }

    /// Address the metrics are meant to be scraped from.
    #[must_use]
    pub const fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Render current metrics in Prometheus format.
    ///
    /// Returns `None` if this server did not install the recorder.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        self.handle.as_ref().map(PrometheusHandle::render)
    }
}

fn register_metrics() {
    // Booking
    describe_counter!(
        "booking_submissions_total",
        "Total number of reservation submissions"
    );
    describe_counter!(
        "booking_accepted_total",
        "Total number of reservations written"
    );
    describe_counter!(
        "booking_rejections_total",
        "Total number of rejected candidates, by reason"
    );
    describe_histogram!(
        "booking_commit_duration_seconds",
        "Time from confirm to acknowledged write"
    );
    describe_gauge!(
        "booking_seats_remaining",
        "Free seats across all bookable slots in the last observed snapshot"
    );

    // Store
    describe_counter!(
        "booking_store_errors_total",
        "Total number of reservation store failures, by operation"
    );

    // Admin
    describe_counter!(
        "admin_deletions_total",
        "Total number of administrative deletions, by outcome"
    );
}

/// Booking metrics recorder.
pub struct BookingMetrics;

impl BookingMetrics {
    /// Record a submission attempt.
    pub fn record_submission() {
        counter!("booking_submissions_total").increment(1);
    }

    /// Record a written reservation and how long its commit took.
    pub fn record_accepted(commit: Duration) {
        counter!("booking_accepted_total").increment(1);
        histogram!("booking_commit_duration_seconds").record(commit.as_secs_f64());
    }

    /// Record a rejection with its reason code.
    pub fn record_rejection(reason: &'static str) {
        counter!("booking_rejections_total", "reason" => reason).increment(1);
    }

    /// Record the free seats seen in the latest snapshot.
    pub fn record_seats_remaining(remaining: u32) {
        gauge!("booking_seats_remaining").set(f64::from(remaining));
    }
}

/// Reservation store metrics recorder.
pub struct StoreMetrics;

impl StoreMetrics {
    /// Record a failed store operation (`subscribe`, `insert`, `delete`, `list`).
    pub fn record_error(op: &'static str) {
        counter!("booking_store_errors_total", "op" => op).increment(1);
    }
}

/// Admin metrics recorder.
pub struct AdminMetrics;

impl AdminMetrics {
    /// Record a successful deletion.
    pub fn record_deleted() {
        counter!("admin_deletions_total", "outcome" => "deleted").increment(1);
    }

    /// Record a failed deletion.
    pub fn record_failed() {
        counter!("admin_deletions_total", "outcome" => "failed").increment(1);
    }
}

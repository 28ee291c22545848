//! Prometheus metrics for the reservation engine.
//!
//! Business metrics recorded by the runtime:
//! - Reservation operation outcomes and latency
//! - Stock holds rejected for insufficient availability
//! - Compensating ledger writes (saga unwinds)
//! - Notification delivery outcomes
//!
//! # Example
//!
//! ```rust,no_run
//! use stockroom_runtime::metrics::MetricsServer;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut server = MetricsServer::new("0.0.0.0:9090".parse()?);
//! server.start()?;
//!
//! // Serve `server.render()` from an HTTP endpoint for scraping
//! # Ok(())
//! # }
//! ```

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::time::Instant;
use stockroom_core::ReservationError;
use thiserror::Error;

/// Reservation operations, by outcome.
pub const RESERVATIONS_TOTAL: &str = "stockroom_reservations_total";
/// Holds rejected for insufficient stock.
pub const STOCK_REJECTIONS_TOTAL: &str = "stockroom_stock_rejections_total";
/// Compensating ledger writes, by outcome.
pub const COMPENSATIONS_TOTAL: &str = "stockroom_compensations_total";
/// Notification deliveries, by outcome.
pub const NOTIFICATIONS_TOTAL: &str = "stockroom_notifications_total";
/// Reservation operation latency, by operation.
pub const OPERATION_DURATION: &str = "stockroom_reservation_operation_duration_seconds";

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

/// Prometheus recorder plus the address its scrape endpoint is served on.
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

    /// Address the scrape endpoint should listen on.
    #[must_use]
    pub const fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Register metric descriptions and install the global recorder.
    ///
    /// # Errors
    ///
    /// Returns error if the exporter cannot be built or installed. An already
    /// installed recorder is tolerated (tests create several servers).
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
                let msg = e.to_string();
                if msg.contains("already initialized") {
                    tracing::warn!("Metrics recorder already initialized, skipping re-initialization");
                    Ok(())
                } else {
                    Err(MetricsError::Install(msg))
                }
            }
        }
    }

    /// Get the metrics handle for rendering.
    #[must_use]
    pub const fn handle(&self) -> Option<&PrometheusHandle> {
        self.handle.as_ref()
    }

    /// Render current metrics in Prometheus text format.
    ///
    /// Returns `None` if this server did not install the recorder.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        self.handle.as_ref().map(PrometheusHandle::render)
    }
}

/// Register all metric descriptions.
pub fn register_metrics() {
    describe_counter!(
        RESERVATIONS_TOTAL,
        "Reservation operations by operation and outcome"
    );
    describe_counter!(
        STOCK_REJECTIONS_TOTAL,
        "Stock holds rejected because not enough units were available"
    );
    describe_counter!(
        COMPENSATIONS_TOTAL,
        "Compensating ledger writes issued while unwinding a failed request"
    );
    describe_counter!(
        NOTIFICATIONS_TOTAL,
        "Reservation-created notifications by delivery outcome"
    );
    describe_histogram!(
        OPERATION_DURATION,
        "Time taken by reservation operations"
    );
}

/// Outcome label for a finished operation.
#[must_use]
pub const fn outcome_label<T>(result: &Result<T, ReservationError>) -> &'static str {
    match result {
        Ok(_) => "success",
        Err(ReservationError::Validation(_)) => "invalid",
        Err(
            ReservationError::ReservationNotFound(_)
            | ReservationError::ProductNotFound(_)
            | ReservationError::StockNotFound(_),
        ) => "not_found",
        Err(ReservationError::InsufficientStock { .. }) => "insufficient_stock",
        Err(ReservationError::InsufficientHold { .. }) => "invariant_violation",
        Err(ReservationError::Conflict(_) | ReservationError::ProductInUse { .. }) => "conflict",
        Err(ReservationError::Store(_)) => "store_error",
    }
}

/// Reservation operation recorder.
pub struct ReservationMetrics;

impl ReservationMetrics {
    /// Record the outcome and latency of one operation.
    pub fn record<T>(operation: &'static str, started: Instant, result: &Result<T, ReservationError>) {
        counter!(
            RESERVATIONS_TOTAL,
            "operation" => operation,
            "outcome" => outcome_label(result)
        )
        .increment(1);
        histogram!(OPERATION_DURATION, "operation" => operation)
            .record(started.elapsed().as_secs_f64());
    }

    /// Record a rejected hold.
    pub fn record_stock_rejection() {
        counter!(STOCK_REJECTIONS_TOTAL).increment(1);
    }

    /// Record one compensating write.
    pub fn record_compensation(succeeded: bool) {
        let outcome = if succeeded { "applied" } else { "failed" };
        counter!(COMPENSATIONS_TOTAL, "outcome" => outcome).increment(1);
    }

    /// Record a notification delivery result.
    pub fn record_notification(outcome: &'static str) {
        counter!(NOTIFICATIONS_TOTAL, "outcome" => outcome).increment(1);
    }
}

//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define the request, error and downstream-call metric families
//! - Keep label sets bounded (route templates and closed enums only)
//! - Render the Prometheus text exposition for `/metrics`
//!
//! # Metrics
//! - `http_requests_total` (counter): service, method, route, status_code
//! - `http_request_duration_seconds` (histogram): service, method, route
//! - `http_errors_total` (counter): service, route, error_type
//! - `external_service_calls_total` (counter): caller, callee, outcome
//! - `external_service_call_duration_seconds` (histogram): caller, callee, outcome
//!
//! # Design Decisions
//! - One recorder per service instance, recorded into through
//!   `metrics::with_local_recorder`, so services sharing a process keep
//!   separate series
//! - Low-overhead metric updates (atomic operations per label tuple)
//! - Fixed histogram buckets tuned for web latencies plus injected delays

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use metrics_exporter_prometheus::{
    BuildError, Matcher, PrometheusBuilder, PrometheusHandle, PrometheusRecorder,
};

use crate::http::error::ErrorKind;

pub const HTTP_REQUESTS_TOTAL: &str = "http_requests_total";
pub const HTTP_REQUEST_DURATION_SECONDS: &str = "http_request_duration_seconds";
pub const HTTP_ERRORS_TOTAL: &str = "http_errors_total";
pub const EXTERNAL_CALLS_TOTAL: &str = "external_service_calls_total";
pub const EXTERNAL_CALL_DURATION_SECONDS: &str = "external_service_call_duration_seconds";

/// Histogram bucket upper bounds, in seconds.
pub const LATENCY_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0,
];

/// Error type for metrics setup.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    #[error("metrics configuration error: {0}")]
    Configuration(#[from] BuildError),
}

/// One completed request.
#[derive(Debug, Clone)]
pub struct RequestMetricEvent<'a> {
    pub method: &'a str,
    pub route: &'a str,
    pub status_code: u16,
    pub duration_seconds: f64,
    pub error_type: Option<ErrorKind>,
}

/// Result class of a downstream call, used as the `outcome` label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallOutcome {
    Success,
    Error,
    Timeout,
}

impl CallOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallOutcome::Success => "success",
            CallOutcome::Error => "error",
            CallOutcome::Timeout => "timeout",
        }
    }
}

/// Per-service metrics store.
pub struct Telemetry {
    service: String,
    recorder: PrometheusRecorder,
    handle: PrometheusHandle,
}

impl std::fmt::Debug for Telemetry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Telemetry").field("service", &self.service).finish()
    }
}

impl Telemetry {
    /// Build the recorder and register metric descriptions.
    pub fn new(service: impl Into<String>) -> Result<Self, MetricsError> {
        let recorder = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Full(HTTP_REQUEST_DURATION_SECONDS.to_string()),
                LATENCY_BUCKETS,
            )?
            .set_buckets_for_metric(
                Matcher::Full(EXTERNAL_CALL_DURATION_SECONDS.to_string()),
                LATENCY_BUCKETS,
            )?
            .build_recorder();
        let handle = recorder.handle();

        metrics::with_local_recorder(&recorder, || {
            describe_counter!(HTTP_REQUESTS_TOTAL, "Completed HTTP requests");
            describe_histogram!(
                HTTP_REQUEST_DURATION_SECONDS,
                Unit::Seconds,
                "HTTP request latency"
            );
            describe_counter!(HTTP_ERRORS_TOTAL, "Failed HTTP requests by error type");
            describe_counter!(EXTERNAL_CALLS_TOTAL, "Calls to downstream services");
            describe_histogram!(
                EXTERNAL_CALL_DURATION_SECONDS,
                Unit::Seconds,
                "Downstream call latency"
            );
        });

        Ok(Self {
            service: service.into(),
            recorder,
            handle,
        })
    }

    /// Count and time one completed request. Failures also bump
    /// `http_errors_total`.
    pub fn record_request(&self, event: &RequestMetricEvent<'_>) {
        let service = self.service.clone();
        let method = event.method.to_string();
        let route = event.route.to_string();
        let duration = event.duration_seconds.max(0.0);

        metrics::with_local_recorder(&self.recorder, || {
            counter!(
                HTTP_REQUESTS_TOTAL,
                "service" => service.clone(),
                "method" => method.clone(),
                "route" => route.clone(),
                "status_code" => event.status_code.to_string()
            )
            .increment(1);

            histogram!(
                HTTP_REQUEST_DURATION_SECONDS,
                "service" => service.clone(),
                "method" => method,
                "route" => route.clone()
            )
            .record(duration);

            if let Some(kind) = event.error_type {
                counter!(
                    HTTP_ERRORS_TOTAL,
                    "service" => service,
                    "route" => route,
                    "error_type" => kind.as_str()
                )
                .increment(1);
            }
        });
    }

    /// Count and time one downstream call.
    pub fn record_external_call(&self, callee: &str, outcome: CallOutcome, duration_seconds: f64) {
        let caller = self.service.clone();
        let callee = callee.to_string();

        metrics::with_local_recorder(&self.recorder, || {
            counter!(
                EXTERNAL_CALLS_TOTAL,
                "caller" => caller.clone(),
                "callee" => callee.clone(),
                "outcome" => outcome.as_str()
            )
            .increment(1);

            histogram!(
                EXTERNAL_CALL_DURATION_SECONDS,
                "caller" => caller,
                "callee" => callee,
                "outcome" => outcome.as_str()
            )
            .record(duration_seconds.max(0.0));
        });
    }

    /// Prometheus text exposition of everything recorded so far.
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

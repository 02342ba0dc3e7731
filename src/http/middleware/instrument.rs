//! Request instrumentation middleware.
//!
//! # Flow
//! ```text
//! request
//!     → resolve CorrelationContext (inserted into request extensions)
//!     → open `request` span (service, trace_id, method, route)
//!     → start timer
//!     → handler, bounded by the handler deadline
//!     → classify outcome (ErrorReport extension / status)
//!     → exactly one counter increment + one latency observation
//!     → INFO on success, ERROR on failure
//!     → echo X-Trace-ID on the response
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{MatchedPath, Request, State},
    http::Method,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::Instrument;

use crate::http::error::{ApiError, ErrorKind, ErrorReport};
use crate::observability::correlation::CorrelationPropagator;
use crate::observability::metrics::{RequestMetricEvent, Telemetry};

/// Route label used when the router did not expose a matched template.
pub const UNMATCHED_ROUTE: &str = "unmatched";

/// State shared by every instrumented route.
#[derive(Debug, Clone)]
pub struct Instrumentation {
    telemetry: Arc<Telemetry>,
    propagator: CorrelationPropagator,
    handler_timeout: Duration,
}

impl Instrumentation {
    pub fn new(
        telemetry: Arc<Telemetry>,
        propagator: CorrelationPropagator,
        handler_timeout: Duration,
    ) -> Self {
        Self {
            telemetry,
            propagator,
            handler_timeout,
        }
    }
}

/// Wrap one handler invocation with correlation, logging and metrics.
pub async fn instrument(
    State(instr): State<Instrumentation>,
    mut request: Request,
    next: Next,
) -> Response {
    let ctx = instr.propagator.resolve(request.headers());
    let method = request.method().clone();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_owned())
        .unwrap_or_else(|| UNMATCHED_ROUTE.to_owned());
    request.extensions_mut().insert(ctx.clone());

    let span = tracing::info_span!(
        "request",
        service = %ctx.service_name(),
        trace_id = %ctx.trace_id(),
        method = %method,
        route = %route,
    );

    async move {
        tracing::info!(
            service = %ctx.service_name(),
            trace_id = %ctx.trace_id(),
            method = %method,
            route = %route,
            "Request started"
        );

        let started = Instant::now();
        let outcome = tokio::time::timeout(instr.handler_timeout, next.run(request)).await;
        let mut response = match outcome {
            Ok(response) => response,
            Err(_) => ApiError::timeout("Request timed out")
                .with_detail(format!("handler exceeded {:?}", instr.handler_timeout))
                .into_response(),
        };
        let duration = started.elapsed().as_secs_f64();
        let status = response.status();
        let report = classify(&response);

        instr.telemetry.record_request(&RequestMetricEvent {
            method: method_label(&method),
            route: &route,
            status_code: status.as_u16(),
            duration_seconds: duration,
            error_type: report.as_ref().map(|r| r.kind),
        });

        match &report {
            Some(report) => tracing::error!(
                service = %ctx.service_name(),
                trace_id = %ctx.trace_id(),
                method = %method,
                route = %route,
                status = status.as_u16(),
                duration_seconds = duration,
                error_type = report.kind.as_str(),
                error = %report.message,
                detail = report.detail.as_deref().unwrap_or_default(),
                "Request failed"
            ),
            None if status.is_client_error() => tracing::warn!(
                service = %ctx.service_name(),
                trace_id = %ctx.trace_id(),
                method = %method,
                route = %route,
                status = status.as_u16(),
                duration_seconds = duration,
                "Request rejected"
            ),
            None => tracing::info!(
                service = %ctx.service_name(),
                trace_id = %ctx.trace_id(),
                method = %method,
                route = %route,
                status = status.as_u16(),
                duration_seconds = duration,
                "Request completed"
            ),
        }

        if let Some(value) = instr.propagator.response_value(&ctx) {
            response
                .headers_mut()
                .insert(instr.propagator.header_name().clone(), value);
        }
        response
    }
    .instrument(span)
    .await
}

/// `method` label value. Extension methods collapse into `OTHER` so a
/// client cannot mint new series.
fn method_label(method: &Method) -> &'static str {
    match method.as_str() {
        "GET" => "GET",
        "POST" => "POST",
        "PUT" => "PUT",
        "PATCH" => "PATCH",
        "DELETE" => "DELETE",
        "HEAD" => "HEAD",
        "OPTIONS" => "OPTIONS",
        "TRACE" => "TRACE",
        "CONNECT" => "CONNECT",
        _ => "OTHER",
    }
}

/// Failure classification for a finished response.
///
/// Handler failures carry an `ErrorReport`; a 5xx without one (a caught
/// panic, a framework error) is still an `internal_error`.
fn classify(response: &Response) -> Option<ErrorReport> {
    if let Some(report) = response.extensions().get::<ErrorReport>() {
        return Some(report.clone());
    }
    let status = response.status();
    status.is_server_error().then(|| ErrorReport {
        kind: ErrorKind::Internal,
        message: status
            .canonical_reason()
            .unwrap_or("Internal Server Error")
            .to_string(),
        detail: Some("response carried no error report".to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_method_label_is_closed() {
        assert_eq!(method_label(&Method::GET), "GET");
        assert_eq!(method_label(&Method::DELETE), "DELETE");
        let custom = Method::from_bytes(b"PURGE").unwrap();
        assert_eq!(method_label(&custom), "OTHER");
    }

    #[test]
    fn test_classify_prefers_report() {
        let response = ApiError::not_found("User not found").into_response();
        let report = classify(&response).unwrap();
        assert_eq!(report.kind, ErrorKind::NotFound);
    }

    #[test]
    fn test_classify_unreported_server_error() {
        let response = StatusCode::BAD_GATEWAY.into_response();
        assert_eq!(classify(&response).unwrap().kind, ErrorKind::Internal);

        let response = StatusCode::METHOD_NOT_ALLOWED.into_response();
        assert!(classify(&response).is_none());
    }
}

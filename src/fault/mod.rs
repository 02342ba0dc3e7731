//! Deterministic fault injection.
//!
//! # Behaviours
//! - `slow(seconds)`: suspend the handling task, then succeed
//! - `error()`: fail with `internal_error`
//! - `cascade_error()`: call the next service's `error` route and fail with
//!   `cascade_failure` when it fails
//!
//! # Design Decisions
//! - Only reachable from the dedicated `/slow`, `/error` and
//!   `/cascade-error` routes, never from resource handlers
//! - Everything runs inside the instrumentation middleware, so injected
//!   latency and failures show up in the regular telemetry
//! - `slow` sleeps on the Tokio timer; other requests are unaffected

use std::time::Duration;

use serde::Serialize;

use crate::config::Role;
use crate::http::client::DownstreamClient;
use crate::http::error::ApiError;
use crate::observability::correlation::CorrelationContext;

/// Message returned by `error()`.
pub const CONTROLLED_ERROR_MESSAGE: &str = "Controlled internal server error";

/// Body of a completed `slow` request.
#[derive(Debug, Clone, Serialize)]
pub struct SlowResponse {
    pub message: String,
    pub delay: f64,
}

/// Body returned when a cascade target unexpectedly succeeds.
#[derive(Debug, Clone, Serialize)]
pub struct CascadeAnomaly {
    pub message: String,
    pub downstream_status: u16,
}

/// Fault behaviours for one service.
#[derive(Debug, Clone, Default)]
pub struct FaultInjector;

impl FaultInjector {
    pub fn new() -> Self {
        Self
    }

    /// Delay completion by exactly `seconds`.
    pub async fn slow(
        &self,
        ctx: &CorrelationContext,
        seconds: f64,
    ) -> Result<SlowResponse, ApiError> {
        if !seconds.is_finite() || seconds < 0.0 {
            return Err(ApiError::validation("Delay must be a non-negative number of seconds")
                .with_detail(format!("rejected delay {seconds}")));
        }
        let delay = Duration::try_from_secs_f64(seconds).map_err(|e| {
            ApiError::validation("Delay is out of range").with_detail(e.to_string())
        })?;

        tracing::warn!(
            service = %ctx.service_name(),
            trace_id = %ctx.trace_id(),
            fault = "slow",
            delay_seconds = seconds,
            "Injecting latency"
        );
        tokio::time::sleep(delay).await;

        Ok(SlowResponse {
            message: format!("Slow response after {seconds} seconds"),
            delay: seconds,
        })
    }

    /// Fail with `internal_error`.
    pub fn error(&self, ctx: &CorrelationContext) -> ApiError {
        tracing::warn!(
            service = %ctx.service_name(),
            trace_id = %ctx.trace_id(),
            fault = "error",
            "Injecting internal error"
        );
        ApiError::internal(CONTROLLED_ERROR_MESSAGE).with_detail("fault injected by error route")
    }

    /// Call `next`'s `error` route with the same correlation id.
    ///
    /// A failing downstream becomes `cascade_failure` here. A downstream that
    /// unexpectedly succeeds is reported as an anomaly, not a crash.
    pub async fn cascade_error(
        &self,
        ctx: &CorrelationContext,
        client: &DownstreamClient,
        next: Role,
    ) -> Result<CascadeAnomaly, ApiError> {
        tracing::warn!(
            service = %ctx.service_name(),
            trace_id = %ctx.trace_id(),
            fault = "cascade",
            callee = next.service_name(),
            "Injecting cascading failure"
        );

        let path = format!("/{}/error", next.resource());
        match client.get(ctx, next, &path).await {
            Ok(response) => {
                tracing::warn!(
                    service = %ctx.service_name(),
                    trace_id = %ctx.trace_id(),
                    fault = "cascade",
                    callee = next.service_name(),
                    downstream_status = response.status.as_u16(),
                    "Cascade target responded successfully; no failure to propagate"
                );
                Ok(CascadeAnomaly {
                    message: format!(
                        "Cascade anomaly: {} did not fail",
                        next.service_name()
                    ),
                    downstream_status: response.status.as_u16(),
                })
            }
            Err(err) => Err(ApiError::cascade(format!(
                "Cascade failure: {} failed",
                next.service_name()
            ))
            .with_detail(err.to_string())),
        }
    }
}

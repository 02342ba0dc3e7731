//! Instrumented downstream HTTP client.
//!
//! # Responsibilities
//! - Forward the correlation header on every outbound call
//! - Enforce connect and total deadlines so a slow downstream cannot hang
//!   the caller
//! - Record `external_service_calls_total` and its latency for every call,
//!   whatever the outcome
//!
//! # Design Decisions
//! - One pooled `reqwest::Client` per service
//! - Non-2xx is a failure; callers that care about a specific status (404
//!   during validation) match on `DownstreamError::Status`
//! - No retries: failures must stay visible

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Bytes;
use axum::http::StatusCode;
use serde::de::DeserializeOwned;
use thiserror::Error;
use url::Url;

use crate::config::{DownstreamConfig, Role, TimeoutConfig};
use crate::http::error::ApiError;
use crate::observability::correlation::{CorrelationContext, CorrelationPropagator};
use crate::observability::metrics::{CallOutcome, Telemetry};

/// Downstream call failures.
#[derive(Debug, Error)]
pub enum DownstreamError {
    #[error("failed to build downstream client: {0}")]
    Build(#[source] reqwest::Error),

    #[error("no downstream URL configured for {0}")]
    NotConfigured(Role),

    #[error("invalid downstream URL for {callee}: {source}")]
    Url {
        callee: Role,
        #[source]
        source: url::ParseError,
    },

    #[error("{} did not respond within {after:?}", .callee.service_name())]
    Timeout { callee: Role, after: Duration },

    #[error("{} returned {status}", .callee.service_name())]
    Status { callee: Role, status: StatusCode },

    #[error("request to {} failed: {source}", .callee.service_name())]
    Transport {
        callee: Role,
        #[source]
        source: reqwest::Error,
    },

    #[error("{} sent an unreadable body: {source}", .callee.service_name())]
    Decode {
        callee: Role,
        #[source]
        source: serde_json::Error,
    },
}

impl DownstreamError {
    /// Metric outcome; `None` when no call was attempted.
    pub fn outcome(&self) -> Option<CallOutcome> {
        match self {
            DownstreamError::Build(_)
            | DownstreamError::NotConfigured(_)
            | DownstreamError::Url { .. } => None,
            DownstreamError::Timeout { .. } => Some(CallOutcome::Timeout),
            DownstreamError::Status { .. }
            | DownstreamError::Transport { .. }
            | DownstreamError::Decode { .. } => Some(CallOutcome::Error),
        }
    }
}

impl From<DownstreamError> for ApiError {
    fn from(err: DownstreamError) -> Self {
        let detail = err.to_string();
        match err {
            DownstreamError::Build(_) => {
                ApiError::downstream("Downstream client unavailable").with_detail(detail)
            }
            DownstreamError::Timeout { callee, .. } => {
                ApiError::timeout(format!("{} timed out", callee.service_name()))
                    .with_detail(detail)
            }
            DownstreamError::NotConfigured(callee)
            | DownstreamError::Url { callee, .. }
            | DownstreamError::Status { callee, .. }
            | DownstreamError::Transport { callee, .. }
            | DownstreamError::Decode { callee, .. } => {
                ApiError::downstream(format!("{} call failed", callee.service_name()))
                    .with_detail(detail)
            }
        }
    }
}

/// A successful (2xx) downstream response.
#[derive(Debug, Clone)]
pub struct DownstreamResponse {
    pub status: StatusCode,
    pub body: Bytes,
}

/// Client for calls to other services in the chain.
#[derive(Debug, Clone)]
pub struct DownstreamClient {
    http: reqwest::Client,
    endpoints: Arc<Vec<(Role, Url)>>,
    propagator: CorrelationPropagator,
    telemetry: Arc<Telemetry>,
    timeout: Duration,
}

impl DownstreamClient {
    pub fn new(
        downstream: &DownstreamConfig,
        timeouts: &TimeoutConfig,
        propagator: CorrelationPropagator,
        telemetry: Arc<Telemetry>,
    ) -> Result<Self, DownstreamError> {
        let timeout = Duration::from_millis(timeouts.downstream_ms);
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_millis(timeouts.downstream_connect_ms))
            .build()
            .map_err(DownstreamError::Build)?;

        let mut endpoints = Vec::new();
        for (role, url) in downstream.entries() {
            let url = Url::parse(url)
                .map_err(|source| DownstreamError::Url { callee: role, source })?;
            endpoints.push((role, url));
        }

        Ok(Self {
            http,
            endpoints: Arc::new(endpoints),
            propagator,
            telemetry,
            timeout,
        })
    }

    /// Whether a base URL is configured for `callee`.
    pub fn is_configured(&self, callee: Role) -> bool {
        self.endpoint(callee).is_some()
    }

    fn endpoint(&self, callee: Role) -> Option<&Url> {
        self.endpoints
            .iter()
            .find(|(role, _)| *role == callee)
            .map(|(_, url)| url)
    }

    /// `GET {base}{path}` on `callee`, forwarding the correlation id.
    pub async fn get(
        &self,
        ctx: &CorrelationContext,
        callee: Role,
        path: &str,
    ) -> Result<DownstreamResponse, DownstreamError> {
        let base = self
            .endpoint(callee)
            .ok_or(DownstreamError::NotConfigured(callee))?;
        let url = endpoint_url(base, path);

        tracing::info!(
            service = %ctx.service_name(),
            trace_id = %ctx.trace_id(),
            callee = callee.service_name(),
            url = %url,
            "Calling downstream service"
        );

        let started = Instant::now();
        let result = self.send(ctx, callee, url).await;
        let elapsed = started.elapsed();

        let outcome = match &result {
            Ok(_) => CallOutcome::Success,
            Err(err) => err.outcome().unwrap_or(CallOutcome::Error),
        };
        self.telemetry
            .record_external_call(callee.service_name(), outcome, elapsed.as_secs_f64());

        match &result {
            Ok(response) => tracing::info!(
                service = %ctx.service_name(),
                trace_id = %ctx.trace_id(),
                callee = callee.service_name(),
                status = response.status.as_u16(),
                duration_seconds = elapsed.as_secs_f64(),
                outcome = outcome.as_str(),
                "Downstream call succeeded"
            ),
            Err(err) => tracing::warn!(
                service = %ctx.service_name(),
                trace_id = %ctx.trace_id(),
                callee = callee.service_name(),
                duration_seconds = elapsed.as_secs_f64(),
                outcome = outcome.as_str(),
                error = %err,
                "Downstream call failed"
            ),
        }

        result
    }

    /// `get` and decode a JSON body.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        ctx: &CorrelationContext,
        callee: Role,
        path: &str,
    ) -> Result<T, DownstreamError> {
        let response = self.get(ctx, callee, path).await?;
        serde_json::from_slice(&response.body)
            .map_err(|source| DownstreamError::Decode { callee, source })
    }

    async fn send(
        &self,
        ctx: &CorrelationContext,
        callee: Role,
        url: Url,
    ) -> Result<DownstreamResponse, DownstreamError> {
        let request = self.propagator.attach(self.http.get(url), ctx);
        let response = request.send().await.map_err(|e| self.classify(callee, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownstreamError::Status { callee, status });
        }
        let body = response.bytes().await.map_err(|e| self.classify(callee, e))?;
        Ok(DownstreamResponse { status, body })
    }

    fn classify(&self, callee: Role, err: reqwest::Error) -> DownstreamError {
        if err.is_timeout() {
            DownstreamError::Timeout {
                callee,
                after: self.timeout,
            }
        } else {
            DownstreamError::Transport { callee, source: err }
        }
    }
}

/// Append `path` to the base URL's own path, keeping any prefix
/// (`http://gw/api` + `/users/1` → `http://gw/api/users/1`).
fn endpoint_url(base: &Url, path: &str) -> Url {
    let mut url = base.clone();
    let prefix = base.path().trim_end_matches('/');
    url.set_path(&format!("{prefix}/{}", path.trim_start_matches('/')));
    url
}

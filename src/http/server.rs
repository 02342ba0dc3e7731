//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router for one service role
//! - Mount resource, health and fault-injection routes
//! - Wire up middleware (instrumentation, panic capture, body limit, tracing)
//! - Serve `/metrics` from the service's own recorder
//! - Run until the shutdown future resolves
//!
//! # Layer order
//! ```text
//! TraceLayer → DefaultBodyLimit → [route] instrument → CatchPanic → handler
//! ```
//! `/metrics` sits outside the route layers so scrapes do not count as
//! traffic.

use std::any::Any;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{rejection::PathRejection, DefaultBodyLimit, Path, State},
    http::header,
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use axum::http::header::InvalidHeaderName;
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};

use crate::config::{Role, ServiceConfig};
use crate::domain;
use crate::fault::{CascadeAnomaly, FaultInjector, SlowResponse};
use crate::health;
use crate::http::client::{DownstreamClient, DownstreamError};
use crate::http::error::ApiError;
use crate::http::middleware::{instrument, Instrumentation};
use crate::observability::correlation::{CorrelationContext, CorrelationPropagator};
use crate::observability::metrics::{MetricsError, Telemetry};

/// Prometheus text exposition content type.
const METRICS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Errors raised while building or running a service.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("metrics setup failed: {0}")]
    Metrics(#[from] MetricsError),

    #[error("invalid correlation header name: {0}")]
    Header(#[from] InvalidHeaderName),

    #[error("downstream client setup failed: {0}")]
    Downstream(#[from] DownstreamError),

    #[error("server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Application state injected into handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    pub role: Role,
    pub faults: FaultInjector,
    pub client: DownstreamClient,
    pub chain_next: Option<Role>,
}

/// HTTP server for one service in the chain.
pub struct ServiceServer {
    router: Router,
    config: ServiceConfig,
    telemetry: Arc<Telemetry>,
}

impl ServiceServer {
    /// Build the telemetry, client and router for `config`.
    ///
    /// `config` is expected to have passed `validate_config`.
    pub fn new(config: ServiceConfig) -> Result<Self, ServerError> {
        let service_name = config.service_name();
        let telemetry = Arc::new(Telemetry::new(service_name.clone())?);
        let propagator = CorrelationPropagator::new(service_name, &config.correlation)?;
        let client = DownstreamClient::new(
            &config.downstream,
            &config.timeouts,
            propagator.clone(),
            telemetry.clone(),
        )?;

        let instrumentation = Instrumentation::new(
            telemetry.clone(),
            propagator,
            Duration::from_secs(config.timeouts.handler_secs),
        );
        let state = AppState {
            role: config.service.role,
            faults: FaultInjector::new(),
            client,
            chain_next: config.chain.next,
        };

        let router = Self::build_router(&config, state, instrumentation, telemetry.clone());
        Ok(Self {
            router,
            config,
            telemetry,
        })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(
        config: &ServiceConfig,
        state: AppState,
        instrumentation: Instrumentation,
        telemetry: Arc<Telemetry>,
    ) -> Router {
        let resource = config.service.role.resource();

        let mut app = Router::new()
            .route("/health", get(health::health))
            .route(&format!("/{resource}/slow/{{seconds}}"), get(slow))
            .route(&format!("/{resource}/error"), get(error));
        if config.chain.next.is_some() {
            app = app.route(&format!("/{resource}/cascade-error"), get(cascade_error));
        }

        let app = app.merge(domain::resource_routes(
            config.service.role,
            config.store.seed,
            state.client.clone(),
        ));
        let app = instrumented(app, instrumentation).with_state(state);

        let exposition = Router::new()
            .route("/metrics", get(metrics))
            .with_state(telemetry);

        app.merge(exposition)
            .layer(DefaultBodyLimit::max(config.limits.max_body_bytes))
            .layer(TraceLayer::new_for_http())
    }

    /// Router with every layer applied; used directly by tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn telemetry(&self) -> Arc<Telemetry> {
        self.telemetry.clone()
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Serve on `listener` until `shutdown` resolves, then drain in-flight
    /// requests.
    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(
            service = %self.config.service_name(),
            role = %self.config.service.role,
            address = %addr,
            chain_next = ?self.config.chain.next,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!(service = %self.config.service_name(), "HTTP server stopped");
        Ok(())
    }
}

/// Apply panic capture and instrumentation to every route in `routes`.
fn instrumented<S>(routes: Router<S>, instrumentation: Instrumentation) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    routes
        .route_layer(CatchPanicLayer::custom(panic_response))
        .route_layer(middleware::from_fn_with_state(instrumentation, instrument))
}

async fn slow(
    State(state): State<AppState>,
    ctx: CorrelationContext,
    path: Result<Path<f64>, PathRejection>,
) -> Result<Json<SlowResponse>, ApiError> {
    let Path(seconds) = path?;
    state.faults.slow(&ctx, seconds).await.map(Json)
}

async fn error(State(state): State<AppState>, ctx: CorrelationContext) -> ApiError {
    state.faults.error(&ctx)
}

async fn cascade_error(
    State(state): State<AppState>,
    ctx: CorrelationContext,
) -> Result<Json<CascadeAnomaly>, ApiError> {
    let next = state.chain_next.ok_or_else(|| {
        ApiError::internal("Internal server error")
            .with_detail("cascade route mounted without a chain target")
    })?;
    state
        .faults
        .cascade_error(&ctx, &state.client, next)
        .await
        .map(Json)
}

async fn metrics(State(telemetry): State<Arc<Telemetry>>) -> impl IntoResponse {
    ([(header::CONTENT_TYPE, METRICS_CONTENT_TYPE)], telemetry.render())
}

/// Turn a handler panic into an `internal_error` response.
fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(message) = panic.downcast_ref::<&str>() {
        format!("handler panicked: {message}")
    } else if let Some(message) = panic.downcast_ref::<String>() {
        format!("handler panicked: {message}")
    } else {
        "handler panicked".to_string()
    };
    ApiError::internal("Internal server error")
        .with_detail(detail)
        .into_response()
}
